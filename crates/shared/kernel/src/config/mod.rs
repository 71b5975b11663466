use config::{Config, Environment, File};
use serde::de::DeserializeOwned;
use std::borrow::Cow;
use std::path::Path;
use tracing::info;

/// Prefix of environment overrides, e.g. `LEADHUB__SERVER__PORT=8080`.
pub const ENV_PREFIX: &str = "LEADHUB";
/// File stem looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "leadhub";

/// Custom error type for config loading.
#[leadhub_derive::leadhub_error]
pub enum ConfigError {
    #[error("Config error{}: {source}", format_context(.context))]
    Config { source: config::ConfigError, context: Option<Cow<'static, str>> },
}

/// Loads layered configuration: file first, then `LEADHUB__*` environment
/// overrides. Nested keys use a double underscore
/// (`LEADHUB__SOCKET__PATH` maps to `socket.path`).
///
/// An explicit `path` must exist. Without one, `leadhub.{toml,..}` in the
/// working directory is used if present, so a bare environment works too.
///
/// # Errors
/// Returns [`ConfigError::Config`] if an explicit file is missing, a source
/// is malformed, or the merged values do not match `T`.
pub fn load_config<T>(path: Option<impl AsRef<Path>>) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    load_config_with(path, environment())
}

/// The `LEADHUB__*` environment source used by [`load_config`].
#[must_use]
pub fn environment() -> Environment {
    Environment::with_prefix(ENV_PREFIX).prefix_separator("__").separator("__").try_parsing(true)
}

/// [`load_config`] with a caller-supplied environment layer.
///
/// # Errors
/// Same as [`load_config`].
pub fn load_config_with<T>(
    path: Option<impl AsRef<Path>>,
    environment: Environment,
) -> Result<T, ConfigError>
where
    T: DeserializeOwned,
{
    let file = match &path {
        Some(p) => {
            info!(path = %p.as_ref().display(), "Loading config file");
            File::from(p.as_ref()).required(true)
        },
        None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
    };

    let config = Config::builder()
        .add_source(file)
        .add_source(environment)
        .build()
        .context("Failed to build config")?
        .try_deserialize::<T>()
        .context("Failed to deserialize config")?;

    Ok(config)
}
