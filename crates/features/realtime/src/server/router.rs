use super::{polling, ws};
use crate::error::RealtimeError;
use leadhub_kernel::domain::config::SocketConfig;
use leadhub_kernel::server::ApiState;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;

/// Socket routes mounted under `config.path`: the WebSocket endpoint at the
/// path itself and the polling fallback below `{path}/poll`.
///
/// # Errors
/// Returns [`RealtimeError::InvalidConfig`] if the path is not absolute or is `/`.
pub fn router(config: &SocketConfig) -> Result<OpenApiRouter<ApiState>, RealtimeError> {
    let path = mount_path(&config.path)?;

    let socket = OpenApiRouter::new()
        .routes(routes!(ws::upgrade))
        .routes(routes!(polling::open))
        .routes(routes!(polling::poll, polling::push, polling::close));

    Ok(OpenApiRouter::new().nest(&path, socket))
}

pub(crate) fn mount_path(raw: &str) -> Result<String, RealtimeError> {
    let trimmed = raw.trim().trim_end_matches('/');
    if !trimmed.starts_with('/') || trimmed.contains(['{', '}', '*']) {
        return Err(RealtimeError::InvalidConfig {
            message: format!("socket.path must be an absolute path below '/', got '{raw}'").into(),
            context: None,
        });
    }
    Ok(trimmed.to_owned())
}

#[cfg(test)]
mod tests {
    use super::mount_path;

    #[test]
    fn mount_path_is_normalized() {
        assert_eq!(mount_path("/socket").ok().as_deref(), Some("/socket"));
        assert_eq!(mount_path(" /socket/ ").ok().as_deref(), Some("/socket"));
        assert_eq!(mount_path("/api/socket").ok().as_deref(), Some("/api/socket"));
    }

    #[test]
    fn root_and_relative_paths_are_rejected() {
        assert!(mount_path("/").is_err());
        assert!(mount_path("socket").is_err());
        assert!(mount_path("/socket/{id}").is_err());
    }
}
