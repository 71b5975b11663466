use anyhow::{Context, Result};
use axum::Router;
use axum::http::{HeaderValue, Method, header};
use leadhub::kernel::server::ApiState;
use leadhub::server::router::{socket_router, system_router};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_scalar::{Scalar, Servable};

#[derive(OpenApi)]
#[openapi(
    info(title = "LeadHub Relay", description = "Realtime lead event relay"),
    tags(
        (name = "system", description = "Process health"),
        (name = "socket", description = "WebSocket endpoint and long-polling fallback"),
    )
)]
struct ApiDoc;

pub(crate) fn init(state: ApiState) -> Result<Router> {
    let cfg = state.config.clone();
    let socket = socket_router(&cfg.socket).context("Invalid socket configuration")?;
    let cors = cors_layer(&cfg.server.allowed_origins)?;

    // Separate the OpenAPI routes and the API documentation object
    let (openapi_routes, api_doc) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(system_router())
        .merge(socket)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
        .split_for_parts();

    let scalar_routes = Scalar::with_url("/api", api_doc);

    Ok(Router::new().merge(openapi_routes).merge(scalar_routes))
}

/// Browsers on the listed origins may use the polling endpoints; none listed
/// means any origin.
fn cors_layer(origins: &[String]) -> Result<CorsLayer> {
    let allow_origin = if origins.is_empty() {
        AllowOrigin::any()
    } else {
        let parsed = origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin)
                    .with_context(|| format!("Invalid CORS origin '{origin}'"))
            })
            .collect::<Result<Vec<_>>>()?;
        AllowOrigin::list(parsed)
    };

    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE]))
}
