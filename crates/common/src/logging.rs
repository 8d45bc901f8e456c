//! Tracing setup shared by the binaries.
//!
//! Events go to stdout, filtered through `RUST_LOG`. Source locations are off unless
//! `LOG_FILE=1` / `LOG_LINE_NUM=1` are set, and `HD_ACCOUNT_SVC_LABEL` tags the process name so
//! logs from several runs against different wallets can be told apart.
use std::env;

use tracing::info;
use tracing_subscriber::{
    fmt, layer::SubscriberExt, util::SubscriberInitExt, util::TryInitError, EnvFilter, Layer,
};

/// Label appended to the process name in the `whoami` field.
pub const SVC_LABEL_ENVVAR: &str = "HD_ACCOUNT_SVC_LABEL";

/// Prints the source file of each event when set to `1`.
pub const LOG_FILE_ENVVAR: &str = "LOG_FILE";

/// Prints the source line of each event when set to `1`.
pub const LOG_LINE_NUM_ENVVAR: &str = "LOG_LINE_NUM";

/// How events are rendered on stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// One line per event, fields inline.
    #[default]
    Compact,
    /// The default `tracing-subscriber` layout, including span context.
    Full,
}

/// Settings for [`init`].
#[derive(Debug, Clone)]
pub struct LoggerConfig {
    /// Identifies the process in the startup event.
    whoami: String,
    format: LogFormat,
    with_file: bool,
    with_line_number: bool,
}

impl LoggerConfig {
    /// Uses `whoami` verbatim; source locations follow the environment.
    pub fn new(whoami: String) -> Self {
        Self {
            whoami,
            format: LogFormat::default(),
            with_file: env_flag(LOG_FILE_ENVVAR),
            with_line_number: env_flag(LOG_LINE_NUM_ENVVAR),
        }
    }

    /// Derives `whoami` from `name` and the service label, see [`get_whoami_string`].
    pub fn with_base_name(name: &str) -> Self {
        Self::new(get_whoami_string(name))
    }

    /// The identity logged at startup.
    pub fn whoami(&self) -> &str {
        &self.whoami
    }

    /// Selects the output layout.
    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    /// Overrides whether source files and line numbers are printed.
    pub fn set_source_location(&mut self, file: bool, line_number: bool) {
        self.with_file = file;
        self.with_line_number = line_number;
    }
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self::with_base_name("hd-account")
    }
}

fn env_flag(name: &str) -> bool {
    env::var(name).is_ok_and(|v| v == "1")
}

/// Installs the global subscriber.
///
/// Fails if a global subscriber has already been installed.
pub fn init(config: LoggerConfig) -> Result<(), TryInitError> {
    let event_format = fmt::format()
        .with_file(config.with_file)
        .with_line_number(config.with_line_number);

    let stdout = match config.format {
        LogFormat::Compact => fmt::layer()
            .event_format(event_format.compact())
            .boxed(),
        LogFormat::Full => fmt::layer().event_format(event_format).boxed(),
    };

    tracing_subscriber::registry()
        .with(stdout.with_filter(EnvFilter::from_default_env()))
        .try_init()?;

    info!(whoami = %config.whoami, format = ?config.format, "logging started");
    Ok(())
}

/// Reads the service label, if any.
pub fn get_service_label_from_env() -> Option<String> {
    env::var(SVC_LABEL_ENVVAR).ok()
}

/// `name%label` when a service label is set, `name` otherwise.
pub fn get_whoami_string(name: &str) -> String {
    get_service_label_from_env().map_or_else(|| name.to_owned(), |label| format!("{name}%{label}"))
}
