#![allow(dead_code)]

use leadhub_kernel::domain::config::{ApiConfig, SocketConfig};
use leadhub_kernel::domain::registry::InitializedSlice;
use leadhub_kernel::server::ApiState;
use leadhub_realtime::Realtime;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

pub const WAIT: Duration = Duration::from_secs(5);

/// A relay served on an ephemeral local port.
pub struct TestRelay {
    pub addr: SocketAddr,
    pub realtime: Realtime,
    server: JoinHandle<()>,
}

impl TestRelay {
    pub fn base(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{path}", self.addr)
    }
}

impl Drop for TestRelay {
    fn drop(&mut self) {
        self.realtime.shutdown();
        self.server.abort();
    }
}

/// Short timeouts so expiry paths run quickly.
pub fn socket_config() -> SocketConfig {
    SocketConfig { poll_timeout_secs: 1, poll_idle_timeout_secs: 2, ..SocketConfig::default() }
}

pub async fn spawn_relay(config: SocketConfig) -> TestRelay {
    let realtime = leadhub_realtime::init(&config).expect("realtime init");

    let mut api = ApiConfig::default();
    api.socket = config.clone();
    let state = ApiState::builder()
        .config(api)
        .gauge(realtime.gauge())
        .register_slice(InitializedSlice::new(realtime.clone()))
        .build()
        .expect("state");

    let (router, _openapi) = leadhub_realtime::router(&config).expect("router").split_for_parts();
    let app = router.with_state(state);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let server = tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    TestRelay { addr, realtime, server }
}

/// Polls `check` until it holds or [`WAIT`] elapses.
pub async fn eventually(mut check: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + WAIT;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    check()
}
