use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use leadhub_kernel::domain::config::ApiConfig;
use leadhub_kernel::domain::registry::{FeatureSlice, InitializedSlice};
use leadhub_kernel::server::{ApiState, ApiStateError, ConnectionGauge, system_router};
use std::any::Any;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tower::ServiceExt;

#[derive(Debug)]
struct Counter(usize);

impl FeatureSlice for Counter {
    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[test]
fn build_requires_config() {
    let err = ApiState::builder().build().expect_err("config is mandatory");
    assert!(matches!(err, ApiStateError::Validation { .. }));
}

#[test]
fn registered_slices_are_retrievable_by_type() {
    let state = ApiState::builder()
        .config(ApiConfig::default())
        .register_slice(InitializedSlice::new(Counter(7)))
        .build()
        .expect("state");

    assert_eq!(state.get_slice::<Counter>().map(|c| c.0), Some(7));
    assert_eq!(state.slice_names().count(), 1);
}

#[test]
fn missing_slice_is_an_error() {
    let state = ApiState::builder().config(ApiConfig::default()).build().expect("state");
    let err = state.try_get_slice::<Counter>().expect_err("not registered");
    assert!(matches!(err, ApiStateError::MissingSlice { .. }));
}

#[tokio::test]
async fn health_reports_live_connections() {
    let live = Arc::new(AtomicUsize::new(3));
    let reader = Arc::clone(&live);
    let state = ApiState::builder()
        .config(ApiConfig::default())
        .gauge(ConnectionGauge::new(move || reader.load(Ordering::Relaxed)))
        .build()
        .expect("state");

    let (router, _api) = system_router().split_for_parts();
    let app = router.with_state(state);

    live.store(5, Ordering::Relaxed);
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).expect("request"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);

    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body: serde_json::Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(body["status"], "up");
    assert_eq!(body["connections"], 5);
    assert!(body["uptime"].is_u64());
}
