use super::relay::{Connection, Relay};
use crate::error::RealtimeError;
use fxhash::FxHashMap;
use leadhub_events::ConnectionId;
use leadhub_kernel::domain::config::SocketConfig;
use leadhub_kernel::domain::events::ServerEvent;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tracing::{debug, info};

/// Upper bound of envelopes returned by a single poll.
const MAX_BATCH: usize = 512;
const MIN_SWEEP_PERIOD: Duration = Duration::from_secs(1);

#[derive(Debug)]
struct Session {
    connection: tokio::sync::Mutex<Connection>,
    last_seen: Mutex<Instant>,
}

impl Session {
    fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }
}

#[derive(Debug)]
struct SessionsInner {
    relay: Relay,
    sessions: RwLock<FxHashMap<ConnectionId, Arc<Session>>>,
    poll_timeout: Duration,
    idle_timeout: Duration,
}

/// Relay connections driven over plain HTTP requests.
#[derive(Debug, Clone)]
pub struct PollSessions {
    inner: Arc<SessionsInner>,
}

impl PollSessions {
    #[must_use]
    pub fn new(relay: Relay, config: &SocketConfig) -> Self {
        Self {
            inner: Arc::new(SessionsInner {
                relay,
                sessions: RwLock::new(FxHashMap::default()),
                poll_timeout: Duration::from_secs(config.poll_timeout_secs),
                idle_timeout: Duration::from_secs(config.poll_idle_timeout_secs),
            }),
        }
    }

    /// Connects a new session; its greeting waits for the first poll.
    ///
    /// # Errors
    /// Fails like [`Relay::connect`] once the relay is shut down.
    pub fn open(&self) -> Result<ConnectionId, RealtimeError> {
        let connection = self.inner.relay.connect()?;
        let id = connection.id().clone();
        let session = Session {
            connection: tokio::sync::Mutex::new(connection),
            last_seen: Mutex::new(Instant::now()),
        };
        self.inner.sessions.write().insert(id.clone(), Arc::new(session));
        debug!(connection = %id, "Polling session opened");
        Ok(id)
    }

    /// Waits up to the poll timeout for an event, then returns everything queued.
    ///
    /// # Errors
    /// [`RealtimeError::UnknownSession`] for an unknown or reaped session,
    /// [`RealtimeError::Closed`] after relay shutdown.
    pub async fn poll(&self, sid: &ConnectionId) -> Result<Vec<Arc<ServerEvent>>, RealtimeError> {
        let session = self.lookup(sid)?;
        session.touch();

        let mut connection = session.connection.lock().await;
        let first = match timeout(self.inner.poll_timeout, connection.recv()).await {
            Ok(Some(event)) => event,
            Ok(None) => {
                drop(connection);
                return Err(self.mailbox_closed(sid));
            },
            Err(_) => {
                session.touch();
                return Ok(Vec::new());
            },
        };

        let mut batch = vec![first];
        batch.extend(connection.drain(MAX_BATCH - 1));
        drop(connection);
        session.touch();
        Ok(batch)
    }

    /// Dispatches one envelope on behalf of a session.
    ///
    /// # Errors
    /// [`RealtimeError::UnknownSession`], [`RealtimeError::Closed`], or
    /// [`RealtimeError::Decode`] for a malformed envelope.
    pub fn push(&self, sid: &ConnectionId, raw: &str) -> Result<usize, RealtimeError> {
        let session = self.lookup(sid)?;
        session.touch();
        self.inner.relay.handle_frame(sid, raw)
    }

    /// Disconnects a session. Returns `false` if it was unknown.
    ///
    /// A poll still waiting on the session wakes up with an error.
    pub fn close(&self, sid: &ConnectionId) -> bool {
        let removed = self.inner.sessions.write().remove(sid).is_some();
        if removed {
            self.inner.relay.disconnect(sid);
            debug!(connection = %sid, "Polling session closed");
        }
        removed
    }

    /// Disconnects every session idle for longer than the idle timeout.
    pub fn sweep(&self) -> usize {
        let idle = self.inner.idle_timeout;
        let mut expired = Vec::new();
        self.inner.sessions.write().retain(|id, session| {
            let keep = session.idle_for() <= idle;
            if !keep {
                expired.push(id.clone());
            }
            keep
        });
        for id in &expired {
            self.inner.relay.disconnect(id);
            info!(connection = %id, "Polling session expired");
        }
        expired.len()
    }

    /// Drops every session. Used on shutdown.
    pub fn clear(&self) -> usize {
        let mut sessions = self.inner.sessions.write();
        let count = sessions.len();
        sessions.clear();
        count
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.sessions.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.sessions.read().is_empty()
    }

    /// Starts the background sweeper. It stops by itself after relay shutdown.
    #[must_use = "dropping the handle detaches the sweeper; keep it to abort on shutdown"]
    pub fn spawn_reaper(&self) -> JoinHandle<()> {
        let sessions = self.clone();
        let period = (self.inner.idle_timeout / 2).max(MIN_SWEEP_PERIOD);

        tokio::spawn(async move {
            let mut ticker = interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if sessions.inner.relay.is_closed() {
                    sessions.clear();
                    break;
                }
                let expired = sessions.sweep();
                if expired > 0 {
                    debug!(expired, remaining = sessions.len(), "Polling sessions swept");
                }
            }
        })
    }

    fn lookup(&self, sid: &ConnectionId) -> Result<Arc<Session>, RealtimeError> {
        if let Some(session) = self.inner.sessions.read().get(sid) {
            return Ok(Arc::clone(session));
        }
        if self.inner.relay.is_closed() {
            return Err(closed(sid));
        }
        Err(RealtimeError::UnknownSession { message: sid.to_string().into(), context: None })
    }

    fn mailbox_closed(&self, sid: &ConnectionId) -> RealtimeError {
        self.close(sid);
        if self.inner.relay.is_closed() {
            closed(sid)
        } else {
            RealtimeError::UnknownSession {
                message: sid.to_string().into(),
                context: Some("session ended".into()),
            }
        }
    }
}

fn closed(sid: &ConnectionId) -> RealtimeError {
    RealtimeError::Closed { message: sid.to_string().into(), context: Some("polling".into()) }
}
