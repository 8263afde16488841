use thiserror::Error;

/// Top-level error type for the `unipoe-api` crate.
///
/// Covers every failure mode of the session API: authentication, session
/// expiry, transport, and the `{meta: {rc, msg}}` envelope. `unipoe-core`
/// wraps these without translating them, so the reconciler and port
/// entities see the same taxonomy as the session client.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// Login rejected (wrong credentials, account locked, etc.)
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    /// 401/403 on an authenticated call. Triggers one re-login + retry.
    #[error("Session expired (HTTP {status}) -- re-authentication required")]
    SessionExpired { status: u16 },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, timeout, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Controller responses ────────────────────────────────────────
    /// Non-success HTTP status outside the auth range (5xx, 404, ...).
    #[error("HTTP {status}: {}", preview(.body))]
    Api { status: u16, body: String },

    /// Error from the legacy envelope (`meta.rc != "ok"`).
    #[error("Controller API error: {message}")]
    LegacyApi { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// A request body could not be encoded as JSON.
    #[error("Serialization error: {0}")]
    Serialization(serde_json::Error),
}

impl Error {
    /// Returns `true` if re-authenticating might resolve this error.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }

    /// Returns `true` if this is a transient network error.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// The raw response body attached to this error, if any.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::Api { body, .. } | Self::Deserialization { body, .. } if !body.is_empty() => {
                Some(body)
            }
            _ => None,
        }
    }
}

fn preview(body: &str) -> &str {
    let end = body
        .char_indices()
        .nth(200)
        .map_or(body.len(), |(idx, _)| idx);
    &body[..end]
}
