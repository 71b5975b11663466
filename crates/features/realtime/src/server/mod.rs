//! Relay and its HTTP transports.

mod polling;
mod relay;
mod router;
mod sessions;
mod ws;

pub use relay::{Connection, Relay};
pub use router::router;
pub use sessions::PollSessions;

use crate::error::RealtimeError;
use leadhub_kernel::domain::config::SocketConfig;
use leadhub_kernel::server::ConnectionGauge;
use router::mount_path;

/// Realtime feature state registered in `ApiState`.
#[leadhub_derive::leadhub_slice]
pub struct Realtime {
    pub relay: Relay,
    pub sessions: PollSessions,
    reaper: tokio::task::JoinHandle<()>,
}

impl Realtime {
    /// Live connections over both transports, for `/health`.
    #[must_use]
    pub fn gauge(&self) -> ConnectionGauge {
        let relay = self.relay.clone();
        ConnectionGauge::new(move || relay.connection_count())
    }

    /// Closes every connection, drops polling sessions and stops the sweeper.
    pub fn shutdown(&self) -> usize {
        let closed = self.relay.shutdown();
        self.sessions.clear();
        self.reaper.abort();
        closed
    }
}

/// Initialize the realtime feature.
///
/// Must run inside a Tokio runtime: it starts the polling session sweeper.
///
/// # Errors
/// Returns [`RealtimeError::InvalidConfig`] for an unusable `path` and
/// [`RealtimeError::Group`] for a zero `mailbox_capacity`.
pub fn init(config: &SocketConfig) -> Result<Realtime, RealtimeError> {
    mount_path(&config.path)?;
    if config.poll_timeout_secs >= config.poll_idle_timeout_secs {
        return Err(RealtimeError::InvalidConfig {
            message: "poll_idle_timeout_secs must exceed poll_timeout_secs".into(),
            context: Some(format!(
                "{} >= {}",
                config.poll_timeout_secs, config.poll_idle_timeout_secs
            )
            .into()),
        });
    }

    let relay = Relay::new(config)?;
    let sessions = PollSessions::new(relay.clone(), config);
    let reaper = sessions.spawn_reaper();

    tracing::info!(
        path = %config.path,
        mailbox = config.mailbox_capacity,
        "Realtime slice initialized"
    );
    Ok(Realtime::new(RealtimeInner { relay, sessions, reaper }))
}
