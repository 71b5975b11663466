//! Realtime feature slice.
//!
//! * `server`: the [`Relay`] that rebroadcasts dashboard events to every
//!   connection, served over WebSocket with a long-polling fallback.
//! * `client`: [`EventClient`], an async dashboard-side client for the same
//!   endpoints.
//!
//! Both sides speak the envelope format in [`protocol`].

mod error;
pub mod protocol;

#[cfg(feature = "client")]
pub mod client;
#[cfg(feature = "server")]
mod server;

pub use error::{RealtimeError, RealtimeErrorExt};

#[cfg(feature = "client")]
pub use client::{EventClient, EventClientBuilder, ListenerId, TransportKind};
#[cfg(feature = "server")]
pub use error::ErrorBody;
#[cfg(feature = "server")]
pub use server::{Connection, PollSessions, Realtime, RealtimeInner, Relay, init, router};
