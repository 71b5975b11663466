use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use leadhub::domain::config::ApiConfig;
use leadhub_server::Server;
use serde_json::Value;
use tower::ServiceExt;

async fn json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    serde_json::from_slice(&bytes).expect("json")
}

#[tokio::test]
async fn health_counts_polling_sessions() {
    let server = Server::builder().build().await.expect("server");
    let app = server.router();

    let response = app
        .clone()
        .oneshot(Request::post("/socket/poll").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    assert!(json(response).await["sid"].is_string());

    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json(response).await["connections"], 1);

    server.realtime().shutdown();
}

#[tokio::test]
async fn api_reference_is_served() {
    let server = Server::builder().build().await.expect("server");

    let response = server
        .router()
        .oneshot(Request::get("/api").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    server.realtime().shutdown();
}

#[tokio::test]
async fn any_origin_is_allowed_by_default() {
    let server = Server::builder().build().await.expect("server");

    let response = server
        .router()
        .oneshot(
            Request::get("/health")
                .header(header::ORIGIN, "https://dash.example.com")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("response");
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).map(|v| v.as_bytes()),
        Some(&b"*"[..])
    );

    server.realtime().shutdown();
}

#[tokio::test]
async fn socket_routes_follow_the_configured_path() {
    let mut cfg = ApiConfig::default();
    cfg.socket.path = "/events".into();
    let server = Server::builder().config(cfg).build().await.expect("server");

    let moved = server
        .router()
        .oneshot(Request::post("/events/poll").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(moved.status(), StatusCode::CREATED);

    let old = server
        .router()
        .oneshot(Request::post("/socket/poll").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(old.status(), StatusCode::NOT_FOUND);

    server.realtime().shutdown();
}

#[tokio::test]
async fn invalid_socket_path_fails_the_build() {
    let mut cfg = ApiConfig::default();
    cfg.socket.path = "relative".into();
    assert!(Server::builder().config(cfg).build().await.is_err());
}

#[tokio::test]
async fn ssl_without_files_fails_the_build() {
    let mut cfg = ApiConfig::default();
    cfg.server.ssl = Some(leadhub::domain::config::SslConfig {
        cert: "/nonexistent/cert.pem".into(),
        key: "/nonexistent/key.pem".into(),
    });
    assert!(Server::builder().config(cfg).build().await.is_err());
}
