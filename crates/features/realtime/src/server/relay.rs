use crate::error::RealtimeError;
use crate::protocol;
use leadhub_events::{BroadcastGroup, ConnectionId, Membership};
use leadhub_kernel::domain::config::SocketConfig;
use leadhub_kernel::domain::constants::{ECHO_PREFIX, LEADS_ROOM, SYSTEM_SENDER};
use leadhub_kernel::domain::events::{ClientEvent, ServerEvent};
use leadhub_kernel::domain::leads::{ChatMessage, Lead, LeadMessage, StatusChange, SystemMessage};
use leadhub_kernel::safe_nanoid;
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug)]
struct RelayInner {
    group: BroadcastGroup<ServerEvent>,
    greeting: String,
}

/// Fans dashboard events out to the "leads" group under their outbound names.
///
/// Cloning is cheap; clones drive the same group.
#[derive(Debug, Clone)]
pub struct Relay {
    inner: Arc<RelayInner>,
}

impl Relay {
    /// # Errors
    /// Returns [`RealtimeError::Group`] if `mailbox_capacity` is zero.
    pub fn new(config: &SocketConfig) -> Result<Self, RealtimeError> {
        let group = BroadcastGroup::with_capacity(LEADS_ROOM, config.mailbox_capacity)?;
        Ok(Self { inner: Arc::new(RelayInner { group, greeting: config.greeting.clone() }) })
    }

    /// Registers a new connection and queues its private greeting.
    ///
    /// # Errors
    /// Returns [`RealtimeError::Group`] with a `Closed` source after
    /// [`Relay::shutdown`].
    pub fn connect(&self) -> Result<Connection, RealtimeError> {
        let id = ConnectionId::from(safe_nanoid!());
        let membership = self.inner.group.join(id.clone())?;
        info!(connection = %id, connections = self.connection_count(), "Client connected");

        let greeting = ServerEvent::Message(SystemMessage::now(SYSTEM_SENDER, self.inner.greeting.as_str()));
        if let Err(e) = self.inner.group.send_to(&id, greeting) {
            warn!(connection = %id, error = %e, "Greeting not delivered");
        }

        Ok(Connection { membership })
    }

    /// Decodes one inbound frame and dispatches it.
    ///
    /// Malformed frames are logged and rejected; the caller keeps the
    /// connection open.
    ///
    /// # Errors
    /// Returns [`RealtimeError::Decode`] if `raw` is not a valid client envelope.
    pub fn handle_frame(&self, from: &ConnectionId, raw: &str) -> Result<usize, RealtimeError> {
        let event = protocol::decode_client(raw).inspect_err(|e| {
            warn!(connection = %from, error = %e, "Dropping malformed frame");
        })?;
        Ok(self.dispatch(from, event))
    }

    /// Routes a decoded client event. Returns the number of members reached.
    pub fn dispatch(&self, from: &ConnectionId, event: ClientEvent) -> usize {
        debug!(connection = %from, event = event.name(), "Event received");
        match event {
            ClientEvent::LeadCreated(lead) => self.emit_new_lead(lead),
            ClientEvent::LeadUpdated(lead) => self.emit_lead_update(lead),
            ClientEvent::MessageNew(message) => self.emit_new_message(message),
            ClientEvent::LeadStatusChanged(change) => self.emit_lead_status(change),
            ClientEvent::Message(chat) => self.echo(from, chat),
        }
    }

    /// Broadcasts `lead:new` to every connection.
    pub fn emit_new_lead(&self, lead: Lead) -> usize {
        self.broadcast(ServerEvent::LeadNew(lead))
    }

    /// Broadcasts `lead:update` to every connection.
    pub fn emit_lead_update(&self, lead: Lead) -> usize {
        self.broadcast(ServerEvent::LeadUpdate(lead))
    }

    /// Broadcasts `message:received` to every connection.
    pub fn emit_new_message(&self, message: LeadMessage) -> usize {
        self.broadcast(ServerEvent::MessageReceived(message))
    }

    /// Broadcasts `lead:status` to every connection.
    pub fn emit_lead_status(&self, change: StatusChange) -> usize {
        self.broadcast(ServerEvent::LeadStatus(change))
    }

    fn broadcast(&self, event: ServerEvent) -> usize {
        let name = event.name();
        let reached = self.inner.group.broadcast(event);
        debug!(event = name, reached, "Event broadcast");
        reached
    }

    fn echo(&self, to: &ConnectionId, chat: ChatMessage) -> usize {
        let reply =
            ServerEvent::Message(SystemMessage::now(SYSTEM_SENDER, format!("{ECHO_PREFIX}{}", chat.text)));
        match self.inner.group.send_to(to, reply) {
            Ok(()) => 1,
            Err(e) => {
                warn!(connection = %to, error = %e, "Echo not delivered");
                0
            },
        }
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.inner.group.len()
    }

    #[must_use]
    pub fn is_connected(&self, id: &ConnectionId) -> bool {
        self.inner.group.contains(id)
    }

    /// Removes a connection from the group even while its handle is still
    /// held elsewhere. Its mailbox yields what is queued, then `None`.
    pub fn disconnect(&self, id: &ConnectionId) -> bool {
        self.inner.group.leave(id)
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.group.is_closed()
    }

    /// Disconnects everyone and refuses new connections.
    ///
    /// Returns the number of connections that were closed.
    pub fn shutdown(&self) -> usize {
        let closed = self.inner.group.shutdown();
        info!(closed, "Relay shut down");
        closed
    }
}

/// One live member of the relay.
///
/// Dropping it disconnects: the member leaves the group.
#[derive(Debug)]
pub struct Connection {
    membership: Membership<ServerEvent>,
}

impl Connection {
    #[must_use]
    pub const fn id(&self) -> &ConnectionId {
        self.membership.id()
    }

    /// Next outbound event; `None` once the relay dropped this connection.
    pub async fn recv(&mut self) -> Option<Arc<ServerEvent>> {
        self.membership.recv().await
    }

    /// Every outbound event already queued, up to `limit`.
    pub fn drain(&mut self, limit: usize) -> Vec<Arc<ServerEvent>> {
        self.membership.drain(limit)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        info!(connection = %self.membership.id(), "Client disconnected");
    }
}
