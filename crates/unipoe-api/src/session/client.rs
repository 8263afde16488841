// Session API HTTP client
//
// Wraps `reqwest::Client` with platform-aware path prefixing, envelope
// unwrapping, CSRF token rotation, and a bounded re-login on session
// expiry. Endpoint modules (sites, devices) and the login flow are
// implemented as inherent methods in separate files to keep this module
// focused on transport mechanics.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use arc_swap::{ArcSwap, ArcSwapOption};
use reqwest::cookie::Jar;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, trace, warn};
use url::Url;

use crate::auth::{ControllerPlatform, Credentials};
use crate::error::Error;
use crate::session::models::LegacyResponse;
use crate::transport::TransportConfig;

/// UniFi OS wraps some errors as `{"error":{"code":N,"message":"..."}}` with HTTP 200.
#[derive(serde::Deserialize)]
struct UnifiOsError {
    error: Option<UnifiOsErrorInner>,
}

#[derive(serde::Deserialize)]
struct UnifiOsErrorInner {
    code: u16,
    message: Option<String>,
}

/// Build a client with an empty cookie jar. Called on every login, which
/// is how the cookie store gets cleared.
pub(crate) fn fresh_http(transport: &TransportConfig) -> Result<reqwest::Client, Error> {
    transport.build_client(&Arc::new(Jar::default()))
}

/// Cookie-authenticated client for the controller's session API.
///
/// Handles the `{ data: [], meta: { rc, msg } }` envelope and the
/// `proxy/network/` prefix on UniFi OS. Every call goes through
/// [`request()`](Self::request), which re-authenticates at most once when
/// the controller reports an expired session.
pub struct SessionClient {
    base_url: Url,
    credentials: Credentials,
    transport: TransportConfig,
    /// Pinned by config or detected by the first root probe.
    pub(crate) platform: OnceCell<ControllerPlatform>,
    pub(crate) http: ArcSwap<reqwest::Client>,
    /// CSRF token for UniFi OS. Captured from login response headers and
    /// rotated via `X-Updated-CSRF-Token` on any later response.
    csrf_token: ArcSwapOption<String>,
    pub(crate) authenticated: AtomicBool,
    /// Bumped whenever a login replaces the HTTP session.
    pub(crate) session_epoch: AtomicU64,
    pub(crate) login_lock: Mutex<()>,
}

impl SessionClient {
    /// Create a client for the controller at `base_url`.
    ///
    /// Pass `Some(platform)` to skip detection. Does not contact the
    /// controller; call [`authenticate()`](Self::authenticate) or just issue
    /// requests and let the first 401 trigger a login.
    pub fn new(
        base_url: Url,
        credentials: Credentials,
        platform: Option<ControllerPlatform>,
        transport: TransportConfig,
    ) -> Result<Self, Error> {
        let http = fresh_http(&transport)?;
        Ok(Self {
            base_url,
            credentials,
            transport,
            platform: OnceCell::new_with(platform),
            http: ArcSwap::from_pointee(http),
            csrf_token: ArcSwapOption::empty(),
            authenticated: AtomicBool::new(false),
            session_epoch: AtomicU64::new(0),
            login_lock: Mutex::new(()),
        })
    }

    /// The controller base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub(crate) fn transport(&self) -> &TransportConfig {
        &self.transport
    }

    /// The controller platform, if already pinned or detected.
    pub fn detected_platform(&self) -> Option<ControllerPlatform> {
        self.platform.get().copied()
    }

    /// Whether the last login succeeded and no 401/403 has been seen since.
    pub fn is_authenticated(&self) -> bool {
        self.authenticated.load(Ordering::Acquire)
    }

    // ── CSRF token management ─────────────────────────────────────────

    pub(crate) fn set_csrf_token(&self, token: Option<String>) {
        self.csrf_token.store(token.map(Arc::new));
    }

    pub(crate) fn csrf_token(&self) -> Option<Arc<String>> {
        self.csrf_token.load_full()
    }

    /// Capture a rotated token from any response. Prefers the updated header.
    pub(crate) fn update_csrf_from_response(&self, headers: &reqwest::header::HeaderMap) {
        let new_token = headers
            .get("X-Updated-CSRF-Token")
            .or_else(|| headers.get("X-CSRF-Token"))
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        if let Some(token) = new_token {
            trace!("CSRF token rotated");
            self.set_csrf_token(Some(token));
        }
    }

    /// Apply the stored CSRF token to a request builder.
    fn apply_csrf(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.csrf_token() {
            Some(token) => builder.header("X-CSRF-Token", token.as_str()),
            None => builder,
        }
    }

    // ── URL builders ─────────────────────────────────────────────────

    /// `{base}/{path}` without any platform prefix (root probe, login, logout).
    pub(crate) fn root_url(&self, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }

    /// `{base}/{prefix}{path}`, e.g. `https://host/proxy/network/api/self/sites`.
    pub(crate) fn api_url(&self, platform: ControllerPlatform, path: &str) -> Result<Url, Error> {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{}{path}", platform.api_prefix()))?)
    }

    // ── Request entry point ──────────────────────────────────────────

    /// Issue an authenticated call and unwrap the envelope's `data`.
    ///
    /// On [`Error::SessionExpired`] the client logs in again and retries the
    /// call exactly once; whatever the retry returns is final. If another
    /// task already replaced the session since this call started, the login
    /// is skipped and only the retry happens.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Vec<T>, Error> {
        let epoch = self.session_epoch.load(Ordering::Acquire);

        match self.send_once(&method, path, body).await {
            Err(err) if err.is_session_expired() => {
                warn!(%method, path, "session expired, logging in again");
                self.reauthenticate(epoch).await?;
                self.send_once(&method, path, body).await
            }
            other => other,
        }
    }

    /// Send a GET request and unwrap the envelope.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, Error> {
        self.request(Method::GET, path, None).await
    }

    /// Send a POST request with JSON body and unwrap the envelope.
    pub(crate) async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<Vec<T>, Error> {
        let body = serde_json::to_value(body).map_err(Error::Serialization)?;
        self.request(Method::POST, path, Some(&body)).await
    }

    /// Send a PUT request with JSON body and unwrap the envelope.
    pub(crate) async fn put<T: DeserializeOwned>(
        &self,
        path: &str,
        body: &(impl Serialize + Sync),
    ) -> Result<Vec<T>, Error> {
        let body = serde_json::to_value(body).map_err(Error::Serialization)?;
        self.request(Method::PUT, path, Some(&body)).await
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: &Method,
        path: &str,
        body: Option<&serde_json::Value>,
    ) -> Result<Vec<T>, Error> {
        let platform = self.platform().await;
        let url = self.api_url(platform, path)?;
        let http = self.http.load_full();

        debug!("{method} {url}");

        let mut builder = self.apply_csrf(http.request(method.clone(), url));
        if let Some(body) = body {
            builder = builder.json(body);
        }
        let resp = builder.send().await?;

        self.parse_envelope(resp).await
    }

    /// Parse the `{ meta, data }` envelope, returning `data` on success.
    ///
    /// Also handles UniFi OS error responses that use a different shape:
    /// `{"error": {"code": 401, "message": "..."}}` (returned with HTTP 200).
    async fn parse_envelope<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<Vec<T>, Error> {
        let status = resp.status();

        // Capture any CSRF token rotation before consuming the response.
        self.update_csrf_from_response(resp.headers());

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            self.authenticated.store(false, Ordering::Release);
            return Err(Error::SessionExpired {
                status: status.as_u16(),
            });
        }

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Api {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp.text().await?;

        if let Ok(wrapper) = serde_json::from_str::<UnifiOsError>(&body) {
            if let Some(err) = wrapper.error {
                if err.code == 401 || err.code == 403 {
                    self.authenticated.store(false, Ordering::Release);
                    return Err(Error::SessionExpired { status: err.code });
                }
                return Err(Error::LegacyApi {
                    message: format!(
                        "UniFi OS error {}: {}",
                        err.code,
                        err.message.unwrap_or_default()
                    ),
                });
            }
        }

        let envelope: LegacyResponse<T> = serde_json::from_str(&body).map_err(|e| {
            let preview: String = body.chars().take(200).collect();
            Error::Deserialization {
                message: format!("{e} (body preview: {preview:?})"),
                body: body.clone(),
            }
        })?;

        match envelope.meta.rc.as_str() {
            "ok" => Ok(envelope.data),
            _ => Err(Error::LegacyApi {
                message: envelope
                    .meta
                    .msg
                    .unwrap_or_else(|| format!("rc={}", envelope.meta.rc)),
            }),
        }
    }
}
