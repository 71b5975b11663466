//! # Logger
//!
//! Installs the global `tracing` subscriber for `LeadHub` binaries.
//!
//! Output goes to the console, to daily rolling files, or both. Either sink
//! can emit JSON lines. The effective filter is `RUST_LOG` when set,
//! otherwise the explicit [`LoggerBuilder::env_filter`], otherwise the
//! default [`LoggerBuilder::level`].
//!
//! ## Example
//!
//! ```rust
//! # use leadhub_logger::{Logger, LevelFilter};
//! let _logger = Logger::builder()
//!     .name("leadhub")
//!     .console(true)
//!     .level(LevelFilter::DEBUG)
//!     .init()
//!     .unwrap();
//! ```

mod error;

pub use crate::error::{LoggerError, LoggerErrorExt};
pub use tracing::level_filters::LevelFilter;
pub use tracing_appender::rolling::Rotation;

use leadhub_domain::config::LoggingConfig;
use private::Sealed;
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::RollingFileAppender;
use tracing_subscriber::fmt::layer;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

const DEFAULT_MAX_FILES: usize = 10;
const LOG_FILE_SUFFIX: &str = "log";

#[derive(Debug)]
struct Settings {
    console: bool,
    stderr: bool,
    path: Option<PathBuf>,
    level: LevelFilter,
    rotation: Rotation,
    max_files: usize,
    json: bool,
    env_filter: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            console: true,
            stderr: false,
            path: None,
            level: LevelFilter::INFO,
            rotation: Rotation::DAILY,
            max_files: DEFAULT_MAX_FILES,
            json: false,
            env_filter: None,
        }
    }
}

#[derive(Debug)]
pub struct NoName;
#[derive(Debug)]
pub struct WithName(String);

mod private {
    pub trait Sealed {}
}
impl Sealed for NoName {}
impl Sealed for WithName {}

/// A builder for configuring and initializing the global tracing subscriber.
#[derive(Debug)]
pub struct LoggerBuilder<N: Sealed = NoName> {
    settings: Settings,
    name: N,
}

impl LoggerBuilder<NoName> {
    /// Sets the name used as the log file prefix.
    pub fn name(self, name: impl Into<String>) -> LoggerBuilder<WithName> {
        LoggerBuilder { name: WithName(name.into()), settings: self.settings }
    }
}

impl LoggerBuilder<WithName> {
    /// Minimum level emitted when neither `RUST_LOG` nor an explicit filter is set.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn level(mut self, level: LevelFilter) -> Self {
        self.settings.level = level;
        self
    }

    /// Adds an explicit filter (e.g., `leadhub_realtime=debug,tower_http=info`).
    ///
    /// `RUST_LOG` still wins when present. Invalid filters make
    /// [`LoggerBuilder::init`] fail.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn env_filter(mut self, filter: impl Into<String>) -> Self {
        self.settings.env_filter = Some(filter.into());
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn console(mut self, enabled: bool) -> Self {
        self.settings.console = enabled;
        self
    }

    /// Sends console output to stderr, keeping stdout free for program output.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn stderr(mut self, enabled: bool) -> Self {
        self.settings.stderr = enabled;
        self
    }

    /// Emits JSON lines instead of the compact text format.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn json(mut self, enabled: bool) -> Self {
        self.settings.json = enabled;
        self
    }

    /// Directory for rolling log files.
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn path(mut self, path: impl Into<PathBuf>) -> Self {
        self.settings.path = Some(path.into());
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn rotation(mut self, rotation: Rotation) -> Self {
        self.settings.rotation = rotation;
        self
    }

    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub const fn max_files(mut self, max: usize) -> Self {
        self.settings.max_files = max;
        self
    }

    /// Applies a [`LoggingConfig`] section on top of the current settings.
    ///
    /// # Errors
    /// Returns [`LoggerError::InvalidConfiguration`] if `level` is not a
    /// known level name.
    pub fn apply(mut self, config: &LoggingConfig) -> Result<Self, LoggerError> {
        self.settings.level = parse_level(&config.level)?;
        self.settings.env_filter.clone_from(&config.env_filter);
        self.settings.path.clone_from(&config.path);
        self.settings.json = config.json;
        self.settings.max_files = config.max_files;
        Ok(self)
    }

    /// Consumes the builder and installs the global subscriber.
    ///
    /// Keep the returned [`Logger`] alive for the lifetime of the program;
    /// dropping it flushes and stops the file writer.
    ///
    /// # Errors
    /// Returns [`LoggerError::Subscriber`] if a global subscriber is already set,
    /// [`LoggerError::InvalidConfiguration`] for invalid settings, or
    /// [`LoggerError::Appender`] if the log directory cannot be used.
    pub fn init(self) -> Result<Logger, LoggerError> {
        validate(&self.settings, &self.name.0)?;

        let filter = build_env_filter(&self.settings)?;
        let mut layers = Vec::new();

        if self.settings.console {
            let console = layer().with_ansi(!self.settings.json);
            layers.push(match (self.settings.json, self.settings.stderr) {
                (true, false) => console.json().boxed(),
                (false, false) => console.compact().boxed(),
                (true, true) => console.json().with_writer(std::io::stderr).boxed(),
                (false, true) => console.compact().with_writer(std::io::stderr).boxed(),
            });
        }

        let guard = if let Some(path) = self.settings.path {
            fs::create_dir_all(&path).map_err(|e| LoggerError::Internal {
                message: e.to_string().into(),
                context: Some(format!("Failed to create path: {}", path.display()).into()),
            })?;

            let appender = RollingFileAppender::builder()
                .rotation(self.settings.rotation)
                .filename_prefix(&self.name.0)
                .filename_suffix(LOG_FILE_SUFFIX)
                .max_log_files(self.settings.max_files)
                .build(&path)
                .context(format!("Log directory {}", path.display()))?;

            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file = layer().with_writer(writer).with_ansi(false);
            layers.push(if self.settings.json { file.json().boxed() } else { file.boxed() });
            Some(guard)
        } else {
            None
        };

        if layers.is_empty() {
            return Err(LoggerError::InvalidConfiguration {
                message: "No logging output enabled. Enable the console or set a path.".into(),
                context: None,
            });
        }

        tracing_subscriber::registry().with(filter).with(layers).try_init()?;

        Ok(Logger { guard })
    }
}

/// A handle to the initialized logging system.
///
/// Holds the file writer's worker guard, if any. Drop it only on shutdown.
#[must_use = "Dropping this handle will stop background logging threads."]
#[derive(Debug)]
pub struct Logger {
    guard: Option<WorkerGuard>,
}

impl Logger {
    #[must_use = "The builder must be configured before it can be used to initialize the logger."]
    pub fn builder() -> LoggerBuilder {
        LoggerBuilder { settings: Settings::default(), name: NoName }
    }

    /// Shorthand for `builder().name(name).apply(config)?.init()`.
    ///
    /// # Errors
    /// See [`LoggerBuilder::apply`] and [`LoggerBuilder::init`].
    pub fn from_config(name: &str, config: &LoggingConfig) -> Result<Self, LoggerError> {
        Self::builder().name(name).apply(config)?.init()
    }

    #[must_use]
    pub const fn has_file_output(&self) -> bool {
        self.guard.is_some()
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if self.guard.is_some() {
            tracing::info!("Logging system shutting down, flushing buffers...");
        }
    }
}

/// Parses `trace`, `debug`, `info`, `warn`, `error` or `off`, ignoring case.
///
/// # Errors
/// Returns [`LoggerError::InvalidConfiguration`] for anything else.
pub fn parse_level(raw: &str) -> Result<LevelFilter, LoggerError> {
    raw.trim().parse::<LevelFilter>().map_err(|e| LoggerError::InvalidConfiguration {
        message: format!("Invalid level '{raw}': {e}").into(),
        context: None,
    })
}

fn validate(settings: &Settings, name: &str) -> Result<(), LoggerError> {
    if name.trim().is_empty() {
        return Err(LoggerError::InvalidConfiguration {
            message: "Logger name cannot be empty".into(),
            context: None,
        });
    }

    if settings.max_files == 0 {
        return Err(LoggerError::InvalidConfiguration {
            message: "max_files must be greater than zero".into(),
            context: None,
        });
    }

    Ok(())
}

fn build_env_filter(settings: &Settings) -> Result<EnvFilter, LoggerError> {
    let builder = EnvFilter::builder().with_default_directive(settings.level.into());
    if std::env::var_os(EnvFilter::DEFAULT_ENV).is_some() {
        return Ok(builder.from_env_lossy());
    }
    settings.env_filter.as_ref().map_or_else(
        || Ok(builder.parse_lossy("")),
        |filter| {
            builder.parse(filter).map_err(|e| LoggerError::InvalidConfiguration {
                message: format!("Invalid env filter '{filter}': {e}").into(),
                context: None,
            })
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_starts_console_only_at_info() {
        let builder = Logger::builder().name("leadhub-test");
        assert!(builder.settings.console);
        assert!(!builder.settings.json);
        assert_eq!(builder.settings.level, LevelFilter::INFO);
        assert!(builder.settings.path.is_none());
    }

    #[test]
    fn apply_copies_the_logging_section() {
        let config = LoggingConfig {
            level: "Debug".into(),
            env_filter: Some("leadhub_realtime=trace".into()),
            path: Some(PathBuf::from("/tmp/leadhub-logs")),
            json: true,
            max_files: 3,
        };

        let builder = Logger::builder().name("leadhub-test").apply(&config).expect("valid config");
        assert_eq!(builder.settings.level, LevelFilter::DEBUG);
        assert_eq!(builder.settings.env_filter.as_deref(), Some("leadhub_realtime=trace"));
        assert_eq!(builder.settings.path.as_deref(), Some(std::path::Path::new("/tmp/leadhub-logs")));
        assert!(builder.settings.json);
        assert_eq!(builder.settings.max_files, 3);
    }

    #[test]
    fn unknown_level_is_rejected() {
        let config = LoggingConfig { level: "loud".into(), ..LoggingConfig::default() };
        let err = Logger::builder().name("leadhub-test").apply(&config).expect_err("bad level");
        assert!(matches!(err, LoggerError::InvalidConfiguration { .. }));
    }

    #[test]
    fn zero_max_files_fails_validation() {
        let builder = Logger::builder().name("leadhub-test").max_files(0);
        assert!(validate(&builder.settings, "leadhub-test").is_err());
    }

    #[test]
    fn blank_name_fails_validation() {
        assert!(validate(&Settings::default(), "  ").is_err());
    }

    #[test]
    fn levels_parse_case_insensitively() {
        assert_eq!(parse_level("WARN").ok(), Some(LevelFilter::WARN));
        assert_eq!(parse_level(" off ").ok(), Some(LevelFilter::OFF));
    }
}
