//! Configuration for the unipoe daemon.
//!
//! One TOML file (plus `UNIPOE_*` environment overrides), credential
//! resolution (env + keyring + plaintext), validation, and translation to
//! `unipoe_core::PlatformConfig`.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use unipoe_api::transport::{TlsMode, TransportConfig};
use unipoe_api::{ControllerPlatform, Credentials};
use unipoe_core::{ControlledPortSpec, MacAddress, PlatformConfig, PortMode};

/// Keyring service name; entries are keyed by username.
pub const KEYRING_SERVICE: &str = "unipoe";
/// Environment variable consulted first for the controller password.
pub const PASSWORD_ENV: &str = "UNIPOE_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("missing required setting '{field}'")]
    Missing { field: String },

    #[error("no password found for user '{username}'")]
    NoCredentials { username: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

fn invalid(field: impl Into<String>, reason: impl Into<String>) -> ConfigError {
    ConfigError::Validation {
        field: field.into(),
        reason: reason.into(),
    }
}

// ── TOML config structs ─────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Controller base URL (e.g., "https://192.168.1.1").
    pub controller: Option<String>,

    pub username: Option<String>,

    /// Password (plaintext -- prefer keyring or `UNIPOE_PASSWORD`).
    pub password: Option<String>,

    /// "unifi-os" or "classic"; probed when unset.
    pub platform: Option<String>,

    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,

    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Accept self-signed certificates.
    #[serde(default = "default_insecure")]
    pub insecure: bool,

    /// Path to a custom CA certificate. Takes precedence over `insecure`.
    pub ca_cert: Option<PathBuf>,

    /// Where registered entities are persisted between runs.
    pub state_file: Option<PathBuf>,

    #[serde(default)]
    pub ports: Vec<PortEntry>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            controller: None,
            username: None,
            password: None,
            platform: None,
            refresh_interval_ms: default_refresh_interval_ms(),
            debounce_ms: default_debounce_ms(),
            timeout_secs: default_timeout_secs(),
            insecure: default_insecure(),
            ca_cert: None,
            state_file: None,
            ports: Vec::new(),
        }
    }
}

/// One `[[ports]]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PortEntry {
    pub mac: String,
    /// Controller port index (1-based).
    pub port: u32,
    pub name: Option<String>,
    #[serde(default)]
    pub mode: PortMode,
    /// PoE mode written when switching an Auto port on.
    #[serde(default = "default_poe_mode")]
    pub poe_mode: String,
}

fn default_refresh_interval_ms() -> u64 {
    60_000
}
fn default_debounce_ms() -> u64 {
    1_000
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_insecure() -> bool {
    true
}
fn default_poe_mode() -> String {
    "auto".into()
}

// ── Paths ───────────────────────────────────────────────────────────

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "unipoe", "unipoe")
}

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("config.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn default_state_path() -> PathBuf {
    project_dirs().map_or_else(
        || dirs_fallback().join("entities.json"),
        |dirs| dirs.data_dir().join("entities.json"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("unipoe");
    p
}

// ── Loading ─────────────────────────────────────────────────────────

/// Defaults, then the TOML file, then `UNIPOE_*` variables.
///
/// The password is never read from the environment here; see
/// [`resolve_password`].
pub fn figment(path: &Path) -> Figment {
    Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("UNIPOE_").ignore(&["password", "ports"]))
}

/// Load the config from `path`, or the platform default location.
///
/// A missing file is not an error; validation reports what is missing.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let path = path.map_or_else(config_path, Path::to_path_buf);
    Ok(figment(&path).extract()?)
}

// ── Credential resolution ───────────────────────────────────────────

/// Password chain: `UNIPOE_PASSWORD`, then the system keyring, then the file.
pub fn resolve_password(config: &Config, username: &str) -> Result<SecretString, ConfigError> {
    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok(SecretString::from(pw));
    }

    if let Ok(entry) = keyring::Entry::new(KEYRING_SERVICE, username) {
        if let Ok(pw) = entry.get_password() {
            return Ok(SecretString::from(pw));
        }
    }

    if let Some(ref pw) = config.password {
        return Ok(SecretString::from(pw.clone()));
    }

    Err(ConfigError::NoCredentials {
        username: username.into(),
    })
}

// ── Validation / translation ────────────────────────────────────────

fn parse_platform(raw: &str) -> Result<ControllerPlatform, ConfigError> {
    match raw.to_ascii_lowercase().as_str() {
        "unifi-os" | "unifi_os" | "unifios" => Ok(ControllerPlatform::UnifiOs),
        "classic" | "legacy" => Ok(ControllerPlatform::ClassicController),
        other => Err(invalid(
            "platform",
            format!("expected 'unifi-os' or 'classic', got '{other}'"),
        )),
    }
}

fn parse_controller(raw: &str) -> Result<Url, ConfigError> {
    let url: Url = raw
        .parse()
        .map_err(|_| invalid("controller", format!("invalid URL: {raw}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(invalid(
            "controller",
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }
    Ok(url)
}

impl Config {
    /// Validated port specs, in file order.
    pub fn port_specs(&self) -> Result<Vec<ControlledPortSpec>, ConfigError> {
        if self.ports.is_empty() {
            return Err(invalid("ports", "at least one [[ports]] entry is required"));
        }

        let mut seen = HashSet::new();
        let mut specs = Vec::with_capacity(self.ports.len());
        for (i, entry) in self.ports.iter().enumerate() {
            let field = format!("ports[{i}]");
            let mac = MacAddress::new(&entry.mac);
            if !mac.is_well_formed() {
                return Err(invalid(&field, format!("malformed MAC '{}'", entry.mac)));
            }
            if entry.port == 0 {
                return Err(invalid(&field, "port indexes start at 1"));
            }
            if entry.poe_mode.is_empty() || entry.poe_mode == "off" {
                return Err(invalid(
                    &field,
                    format!("poe_mode '{}' cannot switch a port on", entry.poe_mode),
                ));
            }

            let spec = ControlledPortSpec {
                mac,
                port_idx: entry.port,
                name: entry.name.clone().filter(|n| !n.is_empty()),
                mode: entry.mode,
                poe_on_mode: entry.poe_mode.clone(),
            };
            if !seen.insert(spec.key()) {
                return Err(invalid(
                    &field,
                    format!("duplicate port {} (mode {})", spec.key().serial(), spec.mode),
                ));
            }
            specs.push(spec);
        }
        Ok(specs)
    }

    pub fn state_path(&self) -> PathBuf {
        self.state_file.clone().unwrap_or_else(default_state_path)
    }

    fn transport(&self) -> Result<TransportConfig, ConfigError> {
        if self.timeout_secs == 0 {
            return Err(invalid("timeout_secs", "must be greater than zero"));
        }
        let tls = if let Some(ref ca_path) = self.ca_cert {
            TlsMode::CustomCa(ca_path.clone())
        } else if self.insecure {
            TlsMode::DangerAcceptInvalid
        } else {
            TlsMode::System
        };
        Ok(TransportConfig {
            tls,
            timeout: Duration::from_secs(self.timeout_secs),
        })
    }

    /// Validate everything and resolve credentials.
    pub fn to_platform_config(&self) -> Result<PlatformConfig, ConfigError> {
        let controller = self
            .controller
            .as_deref()
            .ok_or_else(|| ConfigError::Missing {
                field: "controller".into(),
            })
            .and_then(parse_controller)?;

        let username = self
            .username
            .clone()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ConfigError::Missing {
                field: "username".into(),
            })?;

        let platform = self.platform.as_deref().map(parse_platform).transpose()?;

        if self.refresh_interval_ms == 0 {
            return Err(invalid("refresh_interval_ms", "must be greater than zero"));
        }

        let ports = self.port_specs()?;
        let transport = self.transport()?;
        let password = resolve_password(self, &username)?;

        Ok(PlatformConfig {
            controller,
            credentials: Credentials::new(username, password),
            platform,
            transport,
            refresh_interval: Duration::from_millis(self.refresh_interval_ms),
            debounce: Duration::from_millis(self.debounce_ms),
            ports,
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::io::Write;

    use pretty_assertions::assert_eq;
    use secrecy::ExposeSecret;

    use super::*;

    fn write_config(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    const FULL: &str = r#"
controller = "https://192.168.1.1"
username = "poe-bot"
password = "s3cret"
platform = "unifi-os"
refresh_interval_ms = 15000
debounce_ms = 500
state_file = "/tmp/unipoe-state.json"

[[ports]]
mac = "AA-BB-CC-DD-EE-01"
port = 3
name = "Garage camera"

[[ports]]
mac = "AA:BB:CC:DD:EE:01"
port = 3
mode = "power_cycle"
"#;

    #[test]
    fn loads_file_with_defaults() {
        let file = write_config(FULL);
        let config = load_config(Some(file.path())).unwrap();

        assert_eq!(config.controller.as_deref(), Some("https://192.168.1.1"));
        assert_eq!(config.timeout_secs, 30);
        assert!(config.insecure);
        assert_eq!(config.ports.len(), 2);
        assert_eq!(config.ports[0].mode, PortMode::Auto);
        assert_eq!(config.ports[0].poe_mode, "auto");
        assert_eq!(config.ports[1].mode, PortMode::PowerCycle);
    }

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(Some(&dir.path().join("absent.toml"))).unwrap();

        assert!(config.controller.is_none());
        assert_eq!(config.refresh_interval_ms, 60_000);
        assert_eq!(config.debounce_ms, 1_000);
    }

    #[test]
    fn translates_to_platform_config() {
        let file = write_config(FULL);
        let config = load_config(Some(file.path())).unwrap();
        let platform = config.to_platform_config().unwrap();

        assert_eq!(platform.controller.as_str(), "https://192.168.1.1/");
        assert_eq!(platform.platform, Some(ControllerPlatform::UnifiOs));
        assert_eq!(platform.refresh_interval, Duration::from_millis(15_000));
        assert_eq!(platform.debounce, Duration::from_millis(500));
        assert_eq!(platform.credentials.username, "poe-bot");
        assert!(!platform.credentials.password.expose_secret().is_empty());
        assert!(matches!(platform.transport.tls, TlsMode::DangerAcceptInvalid));

        let serials: Vec<String> = platform.ports.iter().map(|s| s.key().serial()).collect();
        assert_eq!(serials, vec!["aa:bb:cc:dd:ee:01-3", "aa:bb:cc:dd:ee:01-3-pc"]);
        assert_eq!(platform.ports[0].name.as_deref(), Some("Garage camera"));
        assert_eq!(config.state_path(), PathBuf::from("/tmp/unipoe-state.json"));
    }

    #[test]
    fn rejects_duplicate_identity_keys() {
        let file = write_config(
            r#"
controller = "https://unifi.local"
username = "u"
password = "p"

[[ports]]
mac = "aa:bb:cc:dd:ee:01"
port = 3

[[ports]]
mac = "AA:BB:CC:DD:EE:01"
port = 3
mode = "auto"
"#,
        );
        let err = load_config(Some(file.path()))
            .unwrap()
            .to_platform_config()
            .unwrap_err();
        assert!(
            matches!(&err, ConfigError::Validation { field, .. } if field == "ports[1]"),
            "got: {err}"
        );
    }

    #[test]
    fn rejects_malformed_mac_and_zero_port() {
        let mut config = Config {
            ports: vec![PortEntry {
                mac: "not-a-mac".into(),
                port: 1,
                name: None,
                mode: PortMode::Auto,
                poe_mode: "auto".into(),
            }],
            ..Config::default()
        };
        assert!(config.port_specs().is_err());

        config.ports[0].mac = "aa:bb:cc:dd:ee:01".into();
        config.ports[0].port = 0;
        assert!(config.port_specs().is_err());
    }

    #[test]
    fn reports_missing_controller_and_bad_platform() {
        let config = Config::default();
        assert!(matches!(
            config.to_platform_config(),
            Err(ConfigError::Missing { ref field }) if field == "controller"
        ));

        let config = Config {
            controller: Some("https://unifi.local".into()),
            username: Some("u".into()),
            platform: Some("cloud".into()),
            ..Config::default()
        };
        assert!(matches!(
            config.to_platform_config(),
            Err(ConfigError::Validation { ref field, .. }) if field == "platform"
        ));
    }

    #[test]
    fn rejects_non_http_controller() {
        assert!(parse_controller("ftp://unifi.local").is_err());
        assert!(parse_controller("not a url").is_err());
        assert!(parse_controller("http://unifi.local:8443").is_ok());
    }

    #[test]
    fn ca_cert_selects_custom_ca() {
        let config = Config {
            ca_cert: Some(PathBuf::from("/etc/ssl/unifi.pem")),
            ..Config::default()
        };
        assert!(matches!(config.transport().unwrap().tls, TlsMode::CustomCa(_)));

        let config = Config {
            insecure: false,
            ..Config::default()
        };
        assert!(matches!(config.transport().unwrap().tls, TlsMode::System));
    }
}
