use std::borrow::Cow;

/// Realtime relay and client error type.
#[leadhub_derive::leadhub_error]
pub enum RealtimeError {
    /// An envelope that is not valid JSON or does not match the event contract.
    #[error("Malformed envelope{}: {source}", format_context(.context))]
    Decode { source: serde_json::Error, context: Option<Cow<'static, str>> },

    #[error("Unknown session{}: {message}", format_context(.context))]
    UnknownSession { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    /// The relay was shut down.
    #[error("Relay closed{}: {message}", format_context(.context))]
    Closed { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Invalid socket configuration{}: {message}", format_context(.context))]
    InvalidConfig { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[cfg(feature = "server")]
    #[error("Broadcast group error{}: {source}", format_context(.context))]
    Group { source: leadhub_events::GroupError, context: Option<Cow<'static, str>> },

    #[cfg(feature = "server")]
    #[error("Realtime unavailable{}: {source}", format_context(.context))]
    Unavailable {
        source: leadhub_kernel::server::ApiStateError,
        context: Option<Cow<'static, str>>,
    },

    #[cfg(feature = "client")]
    #[error("WebSocket error{}: {source}", format_context(.context))]
    WebSocket {
        source: Box<tokio_tungstenite::tungstenite::Error>,
        context: Option<Cow<'static, str>>,
    },

    #[cfg(feature = "client")]
    #[error("HTTP error{}: {source}", format_context(.context))]
    Http { source: reqwest::Error, context: Option<Cow<'static, str>> },

    #[cfg(feature = "client")]
    #[error("Invalid URL{}: {source}", format_context(.context))]
    Url { source: url::ParseError, context: Option<Cow<'static, str>> },

    /// Every configured transport failed, or none was configured.
    #[error("Not connected{}: {message}", format_context(.context))]
    NotConnected { message: Cow<'static, str>, context: Option<Cow<'static, str>> },

    #[error("Internal error{}: {message}", format_context(.context))]
    Internal { message: Cow<'static, str>, context: Option<Cow<'static, str>> },
}

#[cfg(feature = "server")]
mod http {
    use super::RealtimeError;
    use axum::Json;
    use axum::http::StatusCode;
    use axum::response::{IntoResponse, Response};
    use leadhub_events::GroupError;
    use serde::Serialize;
    use tracing::{debug, error};

    #[derive(Debug, Serialize, utoipa::ToSchema)]
    pub struct ErrorBody {
        pub error: String,
    }

    impl RealtimeError {
        /// HTTP status reported for this error by the polling endpoints.
        #[must_use]
        pub const fn status_code(&self) -> StatusCode {
            match self {
                Self::Decode { .. } => StatusCode::BAD_REQUEST,
                Self::UnknownSession { .. } => StatusCode::NOT_FOUND,
                Self::Closed { .. } | Self::Group { source: GroupError::Closed { .. }, .. } => {
                    StatusCode::GONE
                },
                Self::Unavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
                _ => StatusCode::INTERNAL_SERVER_ERROR,
            }
        }
    }

    impl IntoResponse for RealtimeError {
        fn into_response(self) -> Response {
            let status = self.status_code();
            if status.is_server_error() {
                error!(error = %self, status = status.as_u16(), "Realtime request failed");
            } else {
                debug!(error = %self, status = status.as_u16(), "Realtime request rejected");
            }
            (status, Json(ErrorBody { error: self.to_string() })).into_response()
        }
    }
}

#[cfg(feature = "server")]
pub use http::ErrorBody;

#[cfg(feature = "client")]
impl From<tokio_tungstenite::tungstenite::Error> for RealtimeError {
    fn from(source: tokio_tungstenite::tungstenite::Error) -> Self {
        Self::WebSocket { source: Box::new(source), context: None }
    }
}
