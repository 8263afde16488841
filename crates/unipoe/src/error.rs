//! CLI error types with miette diagnostics.
//!
//! Maps config, engine and controller errors into user-facing errors with
//! actionable help text and a process exit code.

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

use unipoe_config::ConfigError;
use unipoe_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the controller")]
    #[diagnostic(
        code(unipoe::connection_failed),
        help("Check that `controller` points at a running UniFi Network controller.")
    )]
    ConnectionFailed {
        #[source]
        source: unipoe_api::Error,
    },

    #[error("TLS setup failed: {message}")]
    #[diagnostic(
        code(unipoe::tls_error),
        help("Set `insecure = true` for self-signed certificates, or point `ca_cert` at the controller's CA.")
    )]
    TlsError { message: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(unipoe::auth_failed),
        help("Verify `username` and the password in UNIPOE_PASSWORD, the keyring or the config file.")
    )]
    AuthFailed { message: String },

    #[error("No password found for user '{username}'")]
    #[diagnostic(
        code(unipoe::no_credentials),
        help(
            "Set UNIPOE_PASSWORD, store it in the system keyring under service 'unipoe',\n\
             or add `password` to the config file."
        )
    )]
    NoCredentials { username: String },

    // ── Entities ─────────────────────────────────────────────────────
    #[error("Port {serial} is not configured")]
    #[diagnostic(
        code(unipoe::not_configured),
        help("Add a [[ports]] entry for it (use mode = \"power_cycle\" for --power-cycle).")
    )]
    NotConfigured { serial: String },

    #[error("Port {serial} was not found on the controller")]
    #[diagnostic(
        code(unipoe::not_found),
        help("Run: unipoe list to see the ports the controller reports")
    )]
    NotFound { serial: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(unipoe::validation))]
    Validation { field: String, reason: String },

    #[error("Missing required setting '{field}'")]
    #[diagnostic(
        code(unipoe::missing_setting),
        help("Set it in the config file (see --config) or as UNIPOE_{upper}.")
    )]
    MissingSetting { field: String, upper: String },

    #[error(transparent)]
    #[diagnostic(code(unipoe::config))]
    Config(ConfigError),

    // ── Engine / controller ──────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(unipoe::api_error))]
    Api(unipoe_api::Error),

    #[error(transparent)]
    #[diagnostic(code(unipoe::core_error))]
    Core(CoreError),

    // ── State file / output ──────────────────────────────────────────
    #[error("Could not read state file {}", .path.display())]
    #[diagnostic(
        code(unipoe::state_file),
        help("Fix or delete the file; entities are re-registered on the next run.")
    )]
    StateFile {
        path: PathBuf,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("JSON output failed: {0}")]
    #[diagnostic(code(unipoe::json))]
    Json(#[from] serde_json::Error),
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { username } => Self::NoCredentials { username },
            ConfigError::Validation { field, reason } => Self::Validation { field, reason },
            ConfigError::Missing { field } => Self::MissingSetting {
                upper: field.to_ascii_uppercase(),
                field,
            },
            other @ ConfigError::Figment(_) => Self::Config(other),
        }
    }
}

impl From<unipoe_api::Error> for CliError {
    fn from(err: unipoe_api::Error) -> Self {
        match err {
            unipoe_api::Error::Authentication { message } => Self::AuthFailed { message },
            unipoe_api::Error::Tls(message) => Self::TlsError { message },
            unipoe_api::Error::Transport(ref e) if e.is_connect() || e.is_timeout() => {
                Self::ConnectionFailed { source: err }
            }
            other => Self::Api(other),
        }
    }
}

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Api(e) => e.into(),
            other => Self::Core(other),
        }
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::TlsError { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::NotConfigured { .. } | Self::NotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::MissingSetting { .. } => exit_code::USAGE,
            Self::Config(_)
            | Self::Api(_)
            | Self::Core(_)
            | Self::StateFile { .. }
            | Self::Io(_)
            | Self::Json(_) => exit_code::GENERAL,
        }
    }
}
