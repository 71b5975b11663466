use crate::Realtime;
use crate::error::{ErrorBody, RealtimeError};
use crate::protocol::SessionOpened;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use leadhub_events::ConnectionId;
use leadhub_kernel::domain::constants::SOCKET_TAG;
use leadhub_kernel::domain::events::ServerEvent;
use leadhub_kernel::server::ApiState;
use std::sync::Arc;

/// Opens a long-polling session.
#[utoipa::path(
    post,
    path = "/poll",
    responses(
        (status = CREATED, description = "Session opened; the greeting is queued", body = SessionOpened),
        (status = GONE, description = "Relay shut down", body = ErrorBody),
    ),
    tag = SOCKET_TAG,
)]
pub(crate) async fn open(
    State(state): State<ApiState>,
) -> Result<(StatusCode, Json<SessionOpened>), RealtimeError> {
    let realtime = state.try_get_slice::<Realtime>()?;
    let sid = realtime.sessions.open()?;
    Ok((StatusCode::CREATED, Json(SessionOpened { sid: sid.to_string() })))
}

/// Waits for events queued for the session.
///
/// Returns an empty array when nothing arrived before the poll timeout.
#[utoipa::path(
    get,
    path = "/poll/{sid}",
    params(("sid" = String, Path, description = "Polling session id")),
    responses(
        (status = OK, description = "Array of `{event, data}` envelopes in delivery order"),
        (status = NOT_FOUND, description = "Unknown or expired session", body = ErrorBody),
        (status = GONE, description = "Relay shut down", body = ErrorBody),
    ),
    tag = SOCKET_TAG,
)]
pub(crate) async fn poll(
    State(state): State<ApiState>,
    Path(sid): Path<String>,
) -> Result<Json<Vec<Arc<ServerEvent>>>, RealtimeError> {
    let sessions = state.try_get_slice::<Realtime>()?.sessions.clone();
    let batch = sessions.poll(&ConnectionId::from(sid)).await?;
    Ok(Json(batch))
}

/// Sends one envelope, handled exactly like a WebSocket frame.
#[utoipa::path(
    post,
    path = "/poll/{sid}",
    params(("sid" = String, Path, description = "Polling session id")),
    request_body(content = String, description = "One `{event, data}` envelope", content_type = "application/json"),
    responses(
        (status = ACCEPTED, description = "Envelope dispatched"),
        (status = BAD_REQUEST, description = "Malformed envelope", body = ErrorBody),
        (status = NOT_FOUND, description = "Unknown or expired session", body = ErrorBody),
    ),
    tag = SOCKET_TAG,
)]
pub(crate) async fn push(
    State(state): State<ApiState>,
    Path(sid): Path<String>,
    body: String,
) -> Result<StatusCode, RealtimeError> {
    let realtime = state.try_get_slice::<Realtime>()?;
    realtime.sessions.push(&ConnectionId::from(sid), &body)?;
    Ok(StatusCode::ACCEPTED)
}

/// Disconnects a polling session.
#[utoipa::path(
    delete,
    path = "/poll/{sid}",
    params(("sid" = String, Path, description = "Polling session id")),
    responses(
        (status = NO_CONTENT, description = "Session closed"),
        (status = NOT_FOUND, description = "Unknown or expired session", body = ErrorBody),
    ),
    tag = SOCKET_TAG,
)]
pub(crate) async fn close(
    State(state): State<ApiState>,
    Path(sid): Path<String>,
) -> Result<StatusCode, RealtimeError> {
    let realtime = state.try_get_slice::<Realtime>()?;
    let sid = ConnectionId::from(sid);
    if realtime.sessions.close(&sid) {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(RealtimeError::UnknownSession { message: sid.to_string().into(), context: None })
    }
}
