use crate::error::GroupError;
use crate::membership::Membership;
use fxhash::FxHashMap;
use parking_lot::RwLock;
use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, trace, warn};

/// Pending events buffered per member before new ones are dropped.
pub const DEFAULT_MAILBOX_CAPACITY: usize = 256;
const MIN_CAPACITY: usize = 1;

/// Marker trait for types that can be fanned out by a [`BroadcastGroup`].
///
/// Any type that is `Send + Sync + 'static` automatically implements this trait.
pub trait Event: Send + Sync + 'static {}
impl<T: Send + Sync + 'static> Event for T {}

/// Opaque identifier of a group member.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Arc<str>);

impl ConnectionId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(Arc::from(value))
    }
}

impl From<String> for ConnectionId {
    fn from(value: String) -> Self {
        Self(Arc::from(value))
    }
}

impl AsRef<str> for ConnectionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[derive(Debug)]
struct Member<T> {
    sender: mpsc::Sender<Arc<T>>,
    generation: u64,
}

#[derive(Debug)]
pub(crate) struct GroupInner<T> {
    name: Cow<'static, str>,
    capacity: usize,
    members: RwLock<FxHashMap<ConnectionId, Member<T>>>,
    closed: AtomicBool,
    generation: AtomicU64,
}

impl<T> GroupInner<T> {
    /// Removes `id` only if it still belongs to the membership of `generation`.
    pub(crate) fn release(&self, id: &ConnectionId, generation: u64) -> bool {
        let mut members = self.members.write();
        if members.get(id).is_some_and(|m| m.generation == generation) {
            members.remove(id);
            debug!(group = %self.name, member = %id, remaining = members.len(), "Member left");
            true
        } else {
            false
        }
    }
}

/// A thread-safe set of members sharing a fan-out channel.
///
/// Cloning is cheap: clones share the same membership table.
#[derive(Debug)]
pub struct BroadcastGroup<T> {
    inner: Arc<GroupInner<T>>,
}

impl<T> Clone for BroadcastGroup<T> {
    fn clone(&self) -> Self {
        Self { inner: Arc::clone(&self.inner) }
    }
}

impl<T: Event> BroadcastGroup<T> {
    /// Creates an empty group with [`DEFAULT_MAILBOX_CAPACITY`].
    #[must_use]
    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self::build(name.into(), DEFAULT_MAILBOX_CAPACITY)
    }

    /// Creates an empty group whose members buffer up to `capacity` events.
    ///
    /// # Errors
    /// Returns [`GroupError::InvalidCapacity`] if `capacity` is zero.
    pub fn with_capacity(
        name: impl Into<Cow<'static, str>>,
        capacity: usize,
    ) -> Result<Self, GroupError> {
        let name = name.into();
        if capacity < MIN_CAPACITY {
            return Err(GroupError::InvalidCapacity {
                message: format!("capacity must be >= {MIN_CAPACITY}, got {capacity}").into(),
                context: Some(name),
            });
        }
        Ok(Self::build(name, capacity))
    }

    fn build(name: Cow<'static, str>, capacity: usize) -> Self {
        Self {
            inner: Arc::new(GroupInner {
                name,
                capacity,
                members: RwLock::new(FxHashMap::default()),
                closed: AtomicBool::new(false),
                generation: AtomicU64::new(0),
            }),
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    #[must_use]
    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }

    /// Adds a member and returns the handle owning its mailbox.
    ///
    /// # Errors
    /// Returns [`GroupError::DuplicateMember`] if `id` is already joined, or
    /// [`GroupError::Closed`] after [`BroadcastGroup::shutdown`].
    pub fn join(&self, id: impl Into<ConnectionId>) -> Result<Membership<T>, GroupError> {
        let id = id.into();
        let mut members = self.inner.members.write();

        if self.is_closed() {
            return Err(GroupError::Closed {
                message: id.to_string().into(),
                context: Some(self.inner.name.clone()),
            });
        }
        if members.contains_key(&id) {
            return Err(GroupError::DuplicateMember {
                message: id.to_string().into(),
                context: Some(self.inner.name.clone()),
            });
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed);
        let (sender, receiver) = mpsc::channel(self.inner.capacity);
        members.insert(id.clone(), Member { sender, generation });
        debug!(group = %self.inner.name, member = %id, members = members.len(), "Member joined");
        drop(members);

        Ok(Membership::new(id, generation, receiver, Arc::downgrade(&self.inner)))
    }

    /// Removes a member. Its mailbox closes once drained.
    pub fn leave(&self, id: &ConnectionId) -> bool {
        let removed = self.inner.members.write().remove(id).is_some();
        if removed {
            debug!(group = %self.inner.name, member = %id, "Member removed");
        }
        removed
    }

    /// Offers `event` to every current member.
    ///
    /// Returns the number of mailboxes that accepted it. Members with a full
    /// mailbox miss this event; members whose mailbox was dropped are removed.
    pub fn broadcast(&self, event: T) -> usize {
        self.broadcast_arc(Arc::new(event))
    }

    /// Same as [`BroadcastGroup::broadcast`] without re-wrapping.
    pub fn broadcast_arc(&self, event: Arc<T>) -> usize {
        if self.is_closed() {
            trace!(group = %self.inner.name, "Event dropped: group closed");
            return 0;
        }

        let mut delivered = 0usize;
        let mut gone = Vec::new();
        {
            let members = self.inner.members.read();
            for (id, member) in members.iter() {
                match member.sender.try_send(Arc::clone(&event)) {
                    Ok(()) => delivered += 1,
                    Err(TrySendError::Full(_)) => {
                        warn!(group = %self.inner.name, member = %id, "Mailbox full; event dropped");
                    },
                    Err(TrySendError::Closed(_)) => gone.push((id.clone(), member.generation)),
                }
            }
        }

        for (id, generation) in gone {
            self.inner.release(&id, generation);
        }

        trace!(group = %self.inner.name, delivered, "Event dispatched");
        delivered
    }

    /// Queues `event` for a single member.
    ///
    /// # Errors
    /// Returns [`GroupError::UnknownMember`] if `id` is not joined (or its
    /// mailbox was dropped), [`GroupError::MailboxFull`] if the mailbox is
    /// full, or [`GroupError::Closed`] after shutdown.
    pub fn send_to(&self, id: &ConnectionId, event: T) -> Result<(), GroupError> {
        if self.is_closed() {
            return Err(GroupError::Closed {
                message: id.to_string().into(),
                context: Some(self.inner.name.clone()),
            });
        }

        let sender = self.inner.members.read().get(id).map(|m| m.sender.clone());
        let Some(sender) = sender else {
            return Err(GroupError::UnknownMember {
                message: id.to_string().into(),
                context: Some(self.inner.name.clone()),
            });
        };

        sender.try_send(Arc::new(event)).map_err(|e| match e {
            TrySendError::Full(_) => GroupError::MailboxFull {
                message: id.to_string().into(),
                context: Some(self.inner.name.clone()),
            },
            TrySendError::Closed(_) => GroupError::UnknownMember {
                message: id.to_string().into(),
                context: Some("mailbox dropped".into()),
            },
        })
    }

    #[must_use]
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.inner.members.read().contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.members.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.members.read().is_empty()
    }

    /// Snapshot of current member ids, in no particular order.
    #[must_use]
    pub fn members(&self) -> Vec<ConnectionId> {
        self.inner.members.read().keys().cloned().collect()
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::Acquire)
    }

    /// Closes the group and drops every member's sender.
    ///
    /// Pending events stay readable; after that each [`Membership::recv`]
    /// yields `None`. Returns the number of members that were removed.
    #[must_use]
    pub fn shutdown(&self) -> usize {
        let mut members = self.inner.members.write();
        self.inner.closed.store(true, Ordering::Release);
        let count = members.len();
        members.clear();
        drop(members);
        debug!(group = %self.inner.name, count, "Group shut down");
        count
    }
}
