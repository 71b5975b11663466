//! Dashboard-side client for the relay.
//!
//! ```rust,no_run
//! use leadhub_realtime::EventClient;
//!
//! # async fn run() -> Result<(), leadhub_realtime::RealtimeError> {
//! let client = EventClient::builder()
//!     .url("http://localhost:3000")
//!     .on_lead_new(|lead| println!("new lead {}", lead.phone))
//!     .build()
//!     .await?;
//!
//! client.close().await;
//! # Ok(())
//! # }
//! ```

mod listeners;
mod transport;

pub use listeners::{EventHandler, ListenerId};
pub use transport::TransportKind;

use crate::error::{RealtimeError, RealtimeErrorExt};
use leadhub_kernel::domain::events::{ClientEvent, EventKind, ServerEvent};
use leadhub_kernel::domain::leads::{ChatMessage, Lead, LeadMessage, StatusChange, SystemMessage};
use listeners::Dispatcher;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};
use transport::Link;
use url::Url;

/// Environment variable consulted when no URL is given to the builder.
pub const SOCKET_URL_ENV: &str = "LEADHUB_SOCKET_URL";
pub const DEFAULT_SOCKET_URL: &str = "http://localhost:3000";
pub const DEFAULT_SOCKET_PATH: &str = "/socket";
const SUBSCRIBER_CAPACITY: usize = 256;

#[must_use = "builders do nothing unless you call .build()"]
pub struct EventClientBuilder {
    url: Option<String>,
    path: String,
    auto_connect: bool,
    transports: Vec<TransportKind>,
    hooks: Vec<(EventKind, EventHandler)>,
}

impl Default for EventClientBuilder {
    fn default() -> Self {
        Self {
            url: None,
            path: DEFAULT_SOCKET_PATH.to_owned(),
            auto_connect: true,
            transports: vec![TransportKind::WebSocket, TransportKind::Polling],
            hooks: Vec::new(),
        }
    }
}

impl std::fmt::Debug for EventClientBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventClientBuilder")
            .field("url", &self.url)
            .field("path", &self.path)
            .field("auto_connect", &self.auto_connect)
            .field("transports", &self.transports)
            .field("hooks", &self.hooks.len())
            .finish()
    }
}

impl EventClientBuilder {
    /// Base URL of the relay (`http://` or `https://`).
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Socket mount path on the relay.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub const fn auto_connect(mut self, enabled: bool) -> Self {
        self.auto_connect = enabled;
        self
    }

    /// Transports to try, in order.
    pub fn transports(mut self, transports: impl IntoIterator<Item = TransportKind>) -> Self {
        self.transports = transports.into_iter().collect();
        self
    }

    pub fn on_lead_new(self, hook: impl Fn(&Lead) + Send + Sync + 'static) -> Self {
        self.hook(EventKind::LeadNew, move |event| {
            if let ServerEvent::LeadNew(lead) = event {
                hook(lead);
            }
        })
    }

    pub fn on_lead_update(self, hook: impl Fn(&Lead) + Send + Sync + 'static) -> Self {
        self.hook(EventKind::LeadUpdate, move |event| {
            if let ServerEvent::LeadUpdate(lead) = event {
                hook(lead);
            }
        })
    }

    pub fn on_message_received(self, hook: impl Fn(&LeadMessage) + Send + Sync + 'static) -> Self {
        self.hook(EventKind::MessageReceived, move |event| {
            if let ServerEvent::MessageReceived(message) = event {
                hook(message);
            }
        })
    }

    pub fn on_lead_status_change(
        self,
        hook: impl Fn(&StatusChange) + Send + Sync + 'static,
    ) -> Self {
        self.hook(EventKind::LeadStatus, move |event| {
            if let ServerEvent::LeadStatus(change) = event {
                hook(change);
            }
        })
    }

    /// Greeting and echo messages from the relay.
    pub fn on_message(self, hook: impl Fn(&SystemMessage) + Send + Sync + 'static) -> Self {
        self.hook(EventKind::Message, move |event| {
            if let ServerEvent::Message(message) = event {
                hook(message);
            }
        })
    }

    fn hook(
        mut self,
        kind: EventKind,
        handler: impl Fn(&ServerEvent) + Send + Sync + 'static,
    ) -> Self {
        let handler: EventHandler = Arc::new(handler);
        self.hooks.push((kind, handler));
        self
    }

    /// Creates the client and, unless disabled, connects it.
    ///
    /// A failed automatic connect is logged; the client is returned
    /// disconnected and [`EventClient::connect`] can be retried.
    ///
    /// # Errors
    /// Returns [`RealtimeError::Url`] if the base URL does not parse.
    pub async fn build(self) -> Result<EventClient, RealtimeError> {
        let raw = self
            .url
            .or_else(|| std::env::var(SOCKET_URL_ENV).ok())
            .unwrap_or_else(|| DEFAULT_SOCKET_URL.to_owned());
        let base = Url::parse(&raw).context(format!("Parsing socket URL '{raw}'"))?;

        let dispatcher = Arc::new(Dispatcher::new(SUBSCRIBER_CAPACITY));
        for (kind, handler) in self.hooks {
            dispatcher.listeners.on(kind, handler);
        }

        let client = EventClient {
            inner: Arc::new(ClientInner {
                base,
                path: self.path,
                transports: self.transports,
                http: reqwest::Client::new(),
                dispatcher,
                link: Mutex::new(None),
            }),
        };

        if self.auto_connect
            && let Err(e) = client.connect().await
        {
            warn!(error = %e, "Automatic connect failed");
        }
        Ok(client)
    }
}

#[derive(Debug)]
struct ClientInner {
    base: Url,
    path: String,
    transports: Vec<TransportKind>,
    http: reqwest::Client,
    dispatcher: Arc<Dispatcher>,
    link: Mutex<Option<Link>>,
}

/// Async client for the relay's socket endpoint.
///
/// Cloning is cheap; clones share the connection and listeners.
#[derive(Debug, Clone)]
pub struct EventClient {
    inner: Arc<ClientInner>,
}

impl EventClient {
    pub fn builder() -> EventClientBuilder {
        EventClientBuilder::default()
    }

    /// Connects with the first transport that succeeds.
    ///
    /// Returns the transport in use; a live connection is kept as is.
    ///
    /// # Errors
    /// Returns the last transport error when every transport fails, or
    /// [`RealtimeError::NotConnected`] when no transport is configured.
    pub async fn connect(&self) -> Result<TransportKind, RealtimeError> {
        if let Some(kind) = self.transport() {
            return Ok(kind);
        }

        let mut last_error = None;
        for &kind in &self.inner.transports {
            let dispatcher = Arc::clone(&self.inner.dispatcher);
            let opened = match kind {
                TransportKind::WebSocket => {
                    transport::open_websocket(&self.inner.base, &self.inner.path, dispatcher).await
                },
                TransportKind::Polling => {
                    transport::open_polling(
                        &self.inner.http,
                        &self.inner.base,
                        &self.inner.path,
                        dispatcher,
                    )
                    .await
                },
            };

            match opened {
                Ok(link) => {
                    info!(url = %self.inner.base, transport = %kind, "Connected to relay");
                    *self.inner.link.lock() = Some(link);
                    return Ok(kind);
                },
                Err(e) => {
                    warn!(
                        url = %self.inner.base,
                        transport = %kind,
                        error = %e,
                        "Connection failed"
                    );
                    last_error = Some(e);
                },
            }
        }

        Err(last_error.unwrap_or_else(|| RealtimeError::NotConnected {
            message: "no transports configured".into(),
            context: None,
        }))
    }

    #[must_use]
    pub fn is_connected(&self) -> bool {
        self.inner.link.lock().as_ref().is_some_and(Link::is_alive)
    }

    /// Transport of the live connection, if any.
    #[must_use]
    pub fn transport(&self) -> Option<TransportKind> {
        self.inner.link.lock().as_ref().filter(|link| link.is_alive()).map(|link| link.kind)
    }

    /// Registers `handler` for every server event of `kind`.
    pub fn on(
        &self,
        kind: EventKind,
        handler: impl Fn(&ServerEvent) + Send + Sync + 'static,
    ) -> ListenerId {
        self.inner.dispatcher.listeners.on(kind, Arc::new(handler))
    }

    /// Unregisters a listener. Returns `false` if it was already gone.
    pub fn off(&self, id: ListenerId) -> bool {
        self.inner.dispatcher.listeners.off(id)
    }

    /// Channel receiving every server event, independent of listeners.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<ServerEvent>> {
        self.inner.dispatcher.subscribe()
    }

    pub fn emit_lead_created(&self, lead: Lead) -> bool {
        self.emit(ClientEvent::LeadCreated(lead))
    }

    pub fn emit_lead_updated(&self, lead: Lead) -> bool {
        self.emit(ClientEvent::LeadUpdated(lead))
    }

    pub fn emit_message_new(&self, message: LeadMessage) -> bool {
        self.emit(ClientEvent::MessageNew(message))
    }

    pub fn emit_lead_status_changed(&self, change: StatusChange) -> bool {
        self.emit(ClientEvent::LeadStatusChanged(change))
    }

    /// Sends a chat line; the relay echoes it back to this client only.
    pub fn send_message(&self, message: ChatMessage) -> bool {
        self.emit(ClientEvent::Message(message))
    }

    /// Queues an event on the live connection.
    ///
    /// Returns `false`, without error, when not connected.
    pub fn emit(&self, event: ClientEvent) -> bool {
        let link = self.inner.link.lock();
        match link.as_ref().filter(|link| link.is_alive()) {
            Some(link) => link.send(event),
            None => {
                debug!(event = event.name(), "Not connected; event dropped");
                false
            },
        }
    }

    /// Closes the connection, stops its tasks and clears all listeners.
    pub async fn close(&self) {
        let link = self.inner.link.lock().take();
        if let Some(link) = link {
            let kind = link.kind;
            link.close().await;
            info!(transport = %kind, "Connection closed");
        }
        self.inner.dispatcher.listeners.clear();
    }
}
