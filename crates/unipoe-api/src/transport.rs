// Shared transport configuration for building reqwest::Client instances.
//
// The session client rebuilds its HTTP client (and cookie jar) on every
// login, and the platform probe needs a client that never follows
// redirects. Both go through this module so TLS and timeout settings
// stay in one place.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::Jar;
use reqwest::redirect::Policy;

use crate::error::Error;

const USER_AGENT: &str = concat!("unipoe/", env!("CARGO_PKG_VERSION"));

/// TLS verification mode.
#[derive(Debug, Clone)]
pub enum TlsMode {
    /// Use the system certificate store.
    System,
    /// Use a custom CA certificate from the given PEM file.
    CustomCa(PathBuf),
    /// Accept any certificate (for self-signed controllers).
    DangerAcceptInvalid,
}

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub tls: TlsMode,
    pub timeout: Duration,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tls: TlsMode::DangerAcceptInvalid,
            timeout: Duration::from_secs(30),
        }
    }
}

impl TransportConfig {
    /// Build a session client bound to the given cookie jar.
    pub fn build_client(&self, cookie_jar: &Arc<Jar>) -> Result<reqwest::Client, Error> {
        self.builder()?
            .cookie_provider(Arc::clone(cookie_jar))
            .build()
            .map_err(|e| Error::Tls(format!("failed to build HTTP client: {e}")))
    }

    /// Build a cookie-less client that reports redirects instead of following them.
    ///
    /// Used for the controller root probe: UniFi OS answers `GET /` with 200,
    /// classic controllers redirect to `/manage`.
    pub fn build_probe_client(&self) -> Result<reqwest::Client, Error> {
        self.builder()?
            .redirect(Policy::none())
            .build()
            .map_err(|e| Error::Tls(format!("failed to build probe client: {e}")))
    }

    fn builder(&self) -> Result<reqwest::ClientBuilder, Error> {
        let mut builder = reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(USER_AGENT);

        match &self.tls {
            TlsMode::System => {}
            TlsMode::CustomCa(path) => {
                let cert_pem = std::fs::read(path)
                    .map_err(|e| Error::Tls(format!("failed to read CA cert: {e}")))?;
                let cert = reqwest::Certificate::from_pem(&cert_pem)
                    .map_err(|e| Error::Tls(format!("invalid CA cert: {e}")))?;
                builder = builder.add_root_certificate(cert);
            }
            TlsMode::DangerAcceptInvalid => {
                builder = builder.danger_accept_invalid_certs(true);
            }
        }

        Ok(builder)
    }
}
