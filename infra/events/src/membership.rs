use crate::group::{ConnectionId, GroupInner};
use std::fmt;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc::{self, error::TryRecvError};

/// A member's handle on a [`crate::BroadcastGroup`].
///
/// Owns the receiving half of the mailbox. Dropping it leaves the group.
pub struct Membership<T> {
    id: ConnectionId,
    generation: u64,
    receiver: mpsc::Receiver<Arc<T>>,
    group: Weak<GroupInner<T>>,
}

impl<T> Membership<T> {
    pub(crate) const fn new(
        id: ConnectionId,
        generation: u64,
        receiver: mpsc::Receiver<Arc<T>>,
        group: Weak<GroupInner<T>>,
    ) -> Self {
        Self { id, generation, receiver, group }
    }

    #[must_use]
    pub const fn id(&self) -> &ConnectionId {
        &self.id
    }

    /// Waits for the next event, returning `None` once the member was removed
    /// and its mailbox is drained.
    pub async fn recv(&mut self) -> Option<Arc<T>> {
        self.receiver.recv().await
    }

    /// Takes the next event if one is already queued.
    pub fn try_recv(&mut self) -> Option<Arc<T>> {
        match self.receiver.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Takes every event already queued, up to `limit`.
    pub fn drain(&mut self, limit: usize) -> Vec<Arc<T>> {
        let mut batch = Vec::new();
        while batch.len() < limit {
            match self.try_recv() {
                Some(event) => batch.push(event),
                None => break,
            }
        }
        batch
    }

    /// True once the group dropped this member's sender.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.receiver.is_closed()
    }
}

impl<T> fmt::Debug for Membership<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Membership")
            .field("id", &self.id)
            .field("pending", &self.receiver.len())
            .finish_non_exhaustive()
    }
}

impl<T> Drop for Membership<T> {
    fn drop(&mut self) {
        if let Some(group) = self.group.upgrade() {
            group.release(&self.id, self.generation);
        }
    }
}
