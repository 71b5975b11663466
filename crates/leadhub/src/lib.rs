//! Facade crate for `LeadHub` features and shared modules.
//! Re-exports domain/kernel primitives and aggregates feature initialization.
//! Keep this crate thin: it should compose other crates, not implement business logic.
//!
//! ## Usage
//! - Add `leadhub` with the desired feature flags (`server`/`client`).
//! - Call `leadhub::init` (server) to build feature slices and connection gauges.

pub use leadhub_domain as domain;
pub use leadhub_kernel as kernel;

#[cfg(feature = "server")]
use leadhub_domain::config::ApiConfig;
#[cfg(feature = "server")]
use leadhub_domain::registry::InitializedSlice;
#[cfg(feature = "server")]
use leadhub_kernel::server::ConnectionGauge;

#[cfg(feature = "server")]
pub mod server {
    pub mod router {
        pub use leadhub_kernel::server::system_router;
        pub use leadhub_realtime::router as socket_router;
    }
}

/// Feature registry for runtime introspection.
pub mod features {
    pub use leadhub_realtime as realtime;

    /// Build-time enabled features (by Cargo feature).
    pub const ENABLED: &[&str] = &[
        #[cfg(feature = "server")]
        "server",
        #[cfg(feature = "client")]
        "client",
        #[cfg(any(feature = "server", feature = "client"))]
        "realtime",
    ];

    #[must_use]
    pub fn is_enabled(name: &str) -> bool {
        ENABLED.contains(&name)
    }
}

/// Everything a server needs from the enabled features.
#[cfg(feature = "server")]
#[derive(Debug)]
pub struct Platform {
    /// Slices to register in `ApiState`.
    pub slices: Vec<InitializedSlice>,
    /// Live connection counters reported by `/health`.
    pub gauges: Vec<ConnectionGauge>,
    /// Kept by the server to close connections on shutdown.
    pub realtime: features::realtime::Realtime,
}

/// Initialize all enabled features for server mode.
///
/// Must run inside a Tokio runtime.
///
/// # Errors
/// Returns an error if any feature initialization fails.
#[cfg(feature = "server")]
pub fn init(config: &ApiConfig) -> Result<Platform, Box<dyn std::error::Error + Send + Sync>> {
    // Realtime relay
    let realtime = features::realtime::init(&config.socket)?;

    Ok(Platform {
        slices: vec![InitializedSlice::new(realtime.clone())],
        gauges: vec![realtime.gauge()],
        realtime,
    })
}
