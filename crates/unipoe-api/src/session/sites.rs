// Session API site endpoints
//
// Site listing is controller-scoped (not site-scoped), using
// `api/self/sites` rather than the usual `api/s/{site}/...` pattern.

use tracing::debug;

use crate::error::Error;
use crate::session::client::SessionClient;
use crate::session::models::LegacySite;

impl SessionClient {
    /// List all sites visible to the authenticated user.
    ///
    /// `GET api/self/sites`
    pub async fn list_sites(&self) -> Result<Vec<LegacySite>, Error> {
        debug!("listing sites");
        self.get("api/self/sites").await
    }
}
