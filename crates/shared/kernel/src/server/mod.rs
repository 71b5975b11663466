//! Shared HTTP plumbing: application state and the system routes.

mod health;
mod router;
mod state;

pub use health::HealthResponse;
pub use router::system_router;
pub use state::{ApiState, ApiStateBuilder, ApiStateError, ApiStateErrorExt, ApiStateInner, ConnectionGauge};
