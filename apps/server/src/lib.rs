//! # LeadHub Server
//!
//! The realtime lead relay: an `Axum` server exposing the socket endpoint
//! (WebSocket with a long-polling fallback), `/health` and the API reference.
//!
//! ## Example
//! ```no_run
//! use leadhub_server::Server;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     Server::builder()
//!         .port(3000)
//!         .build()
//!         .await?
//!         .run()
//!         .await
//! }
//! ```

mod router;

use anyhow::{Context, Result, anyhow};
use axum::Router;
use axum_server::Handle;
use leadhub::domain::config::ApiConfig;
use leadhub::features::realtime::Realtime;
use leadhub::kernel::server::ApiState;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

const GRACEFUL_SHUTDOWN: Duration = Duration::from_secs(30);

/// A fluent builder for configuring and initializing the [`Server`].
#[must_use = "builders do nothing unless you call .build()"]
#[derive(Debug, Default)]
pub struct ServerBuilder {
    cfg: ApiConfig,
}

impl ServerBuilder {
    /// Set up the server's configuration.
    pub fn config(mut self, cfg: ApiConfig) -> Self {
        self.cfg = cfg;
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.cfg.server.port = port;
        self
    }

    fn validate_ssl_config(&self) -> Result<()> {
        let Some(ssl) = &self.cfg.server.ssl else {
            return Ok(());
        };

        if cfg!(not(feature = "tls")) {
            anyhow::bail!("server.ssl is set but this build lacks the `tls` feature");
        }
        if !ssl.cert.exists() {
            anyhow::bail!("SSL certificate not found at: {}", ssl.cert.display());
        }
        if !ssl.key.exists() {
            anyhow::bail!("SSL key not found at: {}", ssl.key.display());
        }

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let metadata = ssl.key.metadata()?;
            if metadata.permissions().mode() & 0o077 != 0 {
                tracing::warn!(
                    "SECURITY: SSL Private Key {} has insecure permissions (should be 600)",
                    ssl.key.display()
                );
            }
        }
        Ok(())
    }

    /// Consumes the builder and initializes the server.
    ///
    /// # Process
    /// 1. Validates the TLS settings
    /// 2. Initializes the feature slices (the realtime relay)
    /// 3. Constructs application state with slices and connection gauges
    /// 4. Builds the Axum router
    ///
    /// Must run inside a Tokio runtime.
    ///
    /// # Errors
    /// Returns an error if:
    /// * SSL certificate/key files are missing
    /// * The socket configuration is invalid
    /// * A CORS origin is not a valid header value
    pub async fn build(self) -> Result<Server> {
        self.validate_ssl_config()?;

        let address = SocketAddr::new(self.cfg.server.address, self.cfg.server.port);
        info!(address = %address, "Initializing server");

        let platform =
            leadhub::init(&self.cfg).map_err(|e| anyhow!("Platform bootstrap failed: {e}"))?;

        let builder = platform
            .gauges
            .into_iter()
            .fold(ApiState::builder().config(self.cfg), |builder, gauge| builder.gauge(gauge));
        let state = builder
            .register_slices(platform.slices)
            .build()
            .context("Failed to finalize API state registry")?;

        let app = router::init(state.clone())?;
        Ok(Server { state, app, realtime: platform.realtime })
    }
}

/// A fully initialized server instance ready to run.
#[must_use = "call .run().await to start the server"]
#[derive(Debug)]
pub struct Server {
    state: ApiState,
    app: Router,
    realtime: Realtime,
}

impl Server {
    /// Returns a new [`ServerBuilder`] to configure the server.
    pub fn builder() -> ServerBuilder {
        ServerBuilder::default()
    }

    /// Starts the server and runs until a shutdown signal is received.
    ///
    /// On shutdown every socket connection is closed first, so open
    /// WebSockets and pending polls do not hold up the graceful stop.
    ///
    /// # Errors
    /// Returns an error if the server fails to bind to the configured address
    /// or if SSL/TLS setup fails.
    pub async fn run(self) -> Result<()> {
        let cfg = self.state.config.clone();
        let address = SocketAddr::new(cfg.server.address, cfg.server.port);

        info!(
            address = %address,
            ssl = cfg.server.ssl.is_some(),
            socket = %cfg.socket.path,
            "Starting server"
        );

        let handle = Handle::<SocketAddr>::new();
        let shutdown_handle = handle.clone();
        let realtime = self.realtime.clone();

        tokio::spawn(async move {
            if let Err(e) = shutdown_signal().await {
                error!("Error while waiting for shutdown signal: {e}");
                return;
            }
            info!("Shutdown signal received, starting graceful shutdown...");
            let closed = realtime.shutdown();
            info!(closed, "Socket connections closed");
            shutdown_handle.graceful_shutdown(Some(GRACEFUL_SHUTDOWN));
        });

        match &cfg.server.ssl {
            #[cfg(feature = "tls")]
            Some(ssl_config) => {
                info!("Starting HTTPS server on https://{address}");

                let tls_config = axum_server::tls_rustls::RustlsConfig::from_pem_file(
                    &ssl_config.cert,
                    &ssl_config.key,
                )
                .await
                .context("Failed to load SSL/TLS certificates")?;

                axum_server::bind_rustls(address, tls_config)
                    .handle(handle)
                    .serve(self.app.into_make_service())
                    .await
                    .context("HTTPS server failed")?;
            },
            #[cfg(not(feature = "tls"))]
            Some(_) => anyhow::bail!("server.ssl is set but this build lacks the `tls` feature"),
            None => {
                info!("Starting HTTP server on http://{address}");

                axum_server::bind(address)
                    .handle(handle)
                    .serve(self.app.into_make_service())
                    .await
                    .context("HTTP server failed")?;
            },
        }

        info!("Server shutdown complete");
        Ok(())
    }

    /// Returns a reference to the application state.
    #[must_use]
    pub const fn state(&self) -> &ApiState {
        &self.state
    }

    /// The fully layered router, for in-process use.
    #[must_use]
    pub fn router(&self) -> Router {
        self.app.clone()
    }

    /// The realtime slice, e.g. to emit server-side events.
    #[must_use]
    pub const fn realtime(&self) -> &Realtime {
        &self.realtime
    }
}

/// Listens for shutdown signals (Ctrl+C, SIGTERM).
async fn shutdown_signal() -> Result<()> {
    let ctrl_c = async { signal::ctrl_c().await.context("Failed to install Ctrl+C handler") };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .context("Failed to install SIGTERM handler")?
            .recv()
            .await;
        Ok::<_, anyhow::Error>(())
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<Result<()>>();

    tokio::select! {
        res = ctrl_c => {
            res.context("Ctrl+C signal received")?;
        },
        res = terminate => {
            res.context("SIGTERM signal received")?;
        },
    }

    Ok(())
}
