use crate::constants::DEFAULT_GREETING;
use serde::Deserialize;
use std::net::{IpAddr, Ipv4Addr};
use std::ops::{Deref, DerefMut};
use std::path::PathBuf;
use std::sync::Arc;

/// Top-level configuration of the relay process.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ApiConfigInner {
    pub server: ServerConfig,
    pub socket: SocketConfig,
    pub logging: LoggingConfig,
}

/// Thin Arc-wrapped config for inexpensive cloning into subsystems.
#[derive(Default, Debug, Clone, Deserialize)]
#[serde(from = "ApiConfigInner")]
pub struct ApiConfig {
    inner: Arc<ApiConfigInner>,
}

impl From<ApiConfigInner> for ApiConfig {
    fn from(inner: ApiConfigInner) -> Self {
        Self { inner: Arc::new(inner) }
    }
}

impl Deref for ApiConfig {
    type Target = ApiConfigInner;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl DerefMut for ApiConfig {
    fn deref_mut(&mut self) -> &mut ApiConfigInner {
        Arc::make_mut(&mut self.inner)
    }
}

/// HTTP listener configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub address: IpAddr,
    pub port: u16,
    pub ssl: Option<SslConfig>,
    /// Origins allowed to call the polling endpoints from a browser.
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
}

/// TLS certificate/key paths.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SslConfig {
    pub cert: PathBuf,
    pub key: PathBuf,
}

/// Socket endpoint and broadcast group settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SocketConfig {
    /// Mount path of the WebSocket endpoint; polling lives under `{path}/poll`.
    pub path: String,
    /// Text of the private greeting sent on connect.
    pub greeting: String,
    /// Pending events buffered per connection before new ones are dropped.
    pub mailbox_capacity: usize,
    /// How long a poll request waits for the first event.
    pub poll_timeout_secs: u64,
    /// Polling sessions without a poll for this long are disconnected.
    pub poll_idle_timeout_secs: u64,
}

/// Tracing subscriber settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level directive (`trace`..`error`), overridden by `RUST_LOG`.
    pub level: String,
    /// Explicit filter such as `leadhub_realtime=debug,tower_http=info`.
    pub env_filter: Option<String>,
    /// Directory for rolling log files; console only when absent.
    pub path: Option<PathBuf>,
    /// Write file logs as JSON lines.
    pub json: bool,
    pub max_files: usize,
}

// --- Default ---

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 3000,
            ssl: None,
            allowed_origins: Vec::new(),
        }
    }
}

impl Default for SslConfig {
    fn default() -> Self {
        Self { cert: PathBuf::from("cert.pem"), key: PathBuf::from("key.pem") }
    }
}

impl Default for SocketConfig {
    fn default() -> Self {
        Self {
            path: "/socket".to_owned(),
            greeting: DEFAULT_GREETING.to_owned(),
            mailbox_capacity: 256,
            poll_timeout_secs: 25,
            poll_idle_timeout_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_owned(), env_filter: None, path: None, json: false, max_files: 10 }
    }
}
