use leadhub_domain::config::{ApiConfig, LoggingConfig, ServerConfig, SocketConfig};
use leadhub_domain::constants::DEFAULT_GREETING;
use serde_json::json;

#[test]
fn config_defaults_are_sane() {
    let server = ServerConfig::default();
    assert_eq!(server.port, 3000);
    assert!(server.ssl.is_none());
    assert!(server.allowed_origins.is_empty());

    let socket = SocketConfig::default();
    assert_eq!(socket.path, "/socket");
    assert_eq!(socket.greeting, DEFAULT_GREETING);
    assert!(socket.mailbox_capacity > 0);
    assert!(socket.poll_idle_timeout_secs > socket.poll_timeout_secs);

    let logging = LoggingConfig::default();
    assert_eq!(logging.level, "info");
    assert!(logging.path.is_none());
}

#[test]
fn api_config_deserializes_partial_sections() {
    let raw = json!({
        "server": { "address": "::", "port": 8080 },
        "socket": { "path": "/ws", "mailbox_capacity": 8 },
        "logging": { "level": "debug", "json": true }
    });

    let cfg: ApiConfig = serde_json::from_value(raw).expect("config deserialize");
    assert_eq!(cfg.server.port, 8080);
    assert_eq!(cfg.socket.path, "/ws");
    assert_eq!(cfg.socket.mailbox_capacity, 8);
    assert_eq!(cfg.socket.greeting, DEFAULT_GREETING, "unset fields keep defaults");
    assert_eq!(cfg.logging.level, "debug");
    assert!(cfg.logging.json);
}

#[test]
fn api_config_mutation_does_not_leak_into_clones() {
    let original = ApiConfig::default();
    let mut changed = original.clone();
    changed.server.port = 9999;

    assert_eq!(original.server.port, 3000);
    assert_eq!(changed.server.port, 9999);
}
