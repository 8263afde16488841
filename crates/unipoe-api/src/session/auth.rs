// Session authentication
//
// Controller platform detection, cookie-based login/logout, and the
// bounded re-login used by `SessionClient::request`.

use std::sync::Arc;
use std::sync::atomic::Ordering;

use reqwest::StatusCode;
use secrecy::ExposeSecret;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::auth::ControllerPlatform;
use crate::error::Error;
use crate::session::client::{SessionClient, fresh_http};

impl SessionClient {
    /// The controller platform, probing the controller root on first use.
    pub async fn platform(&self) -> ControllerPlatform {
        *self
            .platform
            .get_or_init(|| async { self.detect_platform().await })
            .await
    }

    /// Probe `GET /` without following redirects.
    ///
    /// UniFi OS consoles serve their landing page with HTTP 200; classic
    /// controllers redirect to `/manage`. Anything other than a plain 200,
    /// including a failed probe, is treated as a classic controller.
    async fn detect_platform(&self) -> ControllerPlatform {
        let probe = match self.transport().build_probe_client() {
            Ok(client) => client,
            Err(e) => {
                warn!(error = %e, "cannot build probe client, assuming classic controller");
                return ControllerPlatform::ClassicController;
            }
        };
        let url = match self.root_url("") {
            Ok(url) => url,
            Err(e) => {
                warn!(error = %e, "invalid probe URL, assuming classic controller");
                return ControllerPlatform::ClassicController;
            }
        };

        debug!("probing controller platform at {url}");

        let platform = match probe.get(url).send().await {
            Ok(resp) if resp.status() == StatusCode::OK => ControllerPlatform::UnifiOs,
            Ok(resp) => {
                debug!(status = %resp.status(), "root probe did not return 200");
                ControllerPlatform::ClassicController
            }
            Err(e) => {
                debug!(error = %e, "root probe failed");
                ControllerPlatform::ClassicController
            }
        };

        info!(%platform, "detected controller platform");
        platform
    }

    /// Log in with the configured credentials.
    ///
    /// Detects the platform if it is not pinned, discards every stored
    /// cookie and the CSRF token, then posts the credentials to the
    /// platform's login endpoint on a fresh cookie jar.
    pub async fn authenticate(&self) -> Result<(), Error> {
        let _guard = self.login_lock.lock().await;
        self.login_locked().await
    }

    /// Re-login after a session-expired response observed at `epoch`.
    ///
    /// Skips the login when a concurrent caller already replaced the
    /// session in the meantime.
    pub(crate) async fn reauthenticate(&self, epoch: u64) -> Result<(), Error> {
        let _guard = self.login_lock.lock().await;
        if self.session_epoch.load(Ordering::Acquire) != epoch {
            debug!("session already renewed by a concurrent login");
            return Ok(());
        }
        self.login_locked().await
    }

    async fn login_locked(&self) -> Result<(), Error> {
        let platform = self.platform().await;

        // UniFi OS answers api/auth/login with 404 while login cookies exist.
        self.authenticated.store(false, Ordering::Release);
        self.set_csrf_token(None);
        let http = fresh_http(self.transport())?;
        self.http.store(Arc::new(http.clone()));
        self.session_epoch.fetch_add(1, Ordering::AcqRel);

        let url = self.root_url(platform.login_path())?;
        debug!("logging in at {url}");

        let credentials = self.credentials();
        let body = json!({
            "username": credentials.username,
            "password": credentials.password.expose_secret(),
        });

        let resp = http.post(url).json(&body).send().await?;

        let status = resp.status();
        self.update_csrf_from_response(resp.headers());
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Authentication {
                message: format!("login failed (HTTP {status}): {body}"),
            });
        }

        self.authenticated.store(true, Ordering::Release);
        info!(username = %credentials.username, "logged into controller");
        Ok(())
    }

    /// End the current session.
    pub async fn logout(&self) -> Result<(), Error> {
        let platform = self.platform().await;
        let url = self.root_url(platform.logout_path())?;

        debug!("logging out at {url}");

        let http = self.http.load_full();
        let builder = match self.csrf_token() {
            Some(token) => http.post(url).header("X-CSRF-Token", token.as_str()),
            None => http.post(url),
        };
        let _resp = builder.send().await?;

        self.authenticated.store(false, Ordering::Release);
        debug!("logout complete");
        Ok(())
    }
}
