use super::relay::{Connection, Relay};
use crate::Realtime;
use crate::error::RealtimeError;
use crate::protocol;
use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use leadhub_kernel::domain::constants::SOCKET_TAG;
use leadhub_kernel::server::ApiState;
use tracing::{debug, error, trace, warn};

/// Upgrades to a WebSocket connection joined to the "leads" group.
#[utoipa::path(
    get,
    path = "/",
    responses(
        (status = SWITCHING_PROTOCOLS, description = "WebSocket upgrade; each text frame is one `{event, data}` envelope"),
        (status = GONE, description = "Relay shut down", body = crate::error::ErrorBody),
        (status = SERVICE_UNAVAILABLE, description = "Realtime slice not registered", body = crate::error::ErrorBody),
    ),
    tag = SOCKET_TAG,
)]
pub(crate) async fn upgrade(
    ws: WebSocketUpgrade,
    State(state): State<ApiState>,
) -> Result<Response, RealtimeError> {
    let realtime = state.try_get_slice::<Realtime>()?;
    let relay = realtime.relay.clone();
    let connection = relay.connect()?;

    Ok(ws.on_upgrade(move |socket| serve(socket, relay, connection)))
}

async fn serve(socket: WebSocket, relay: Relay, mut connection: Connection) {
    let id = connection.id().clone();
    let (mut sink, mut stream) = socket.split();

    let mut writer = tokio::spawn(async move {
        while let Some(event) = connection.recv().await {
            let frame = match protocol::encode(event.as_ref()) {
                Ok(frame) => frame,
                Err(e) => {
                    error!(connection = %connection.id(), error = %e, "Failed to encode event");
                    continue;
                },
            };
            if sink.send(Message::Text(frame.into())).await.is_err() {
                return;
            }
        }
        // Mailbox closed by relay shutdown.
        let _ = sink.send(Message::Close(None)).await;
    });

    let reader_id = id.clone();
    let mut reader = tokio::spawn(async move {
        while let Some(message) = stream.next().await {
            match message {
                // Malformed frames are logged by the relay; the socket stays open.
                Ok(Message::Text(text)) => {
                    relay.handle_frame(&reader_id, text.as_str()).ok();
                },
                Ok(Message::Binary(bytes)) => {
                    warn!(connection = %reader_id, len = bytes.len(), "Ignoring binary frame");
                },
                // Pongs for incoming pings are queued by the protocol layer.
                Ok(Message::Ping(_) | Message::Pong(_)) => trace!(connection = %reader_id, "Heartbeat"),
                Ok(Message::Close(_)) => break,
                Err(e) => {
                    debug!(connection = %reader_id, error = %e, "WebSocket read failed");
                    break;
                },
            }
        }
    });

    tokio::select! {
        _ = &mut writer => reader.abort(),
        _ = &mut reader => writer.abort(),
    }
    debug!(connection = %id, "WebSocket session ended");
}
