// Session API device endpoints
//
// Device listing via stat/device, port override writes via rest/device,
// and the momentary PoE power-cycle via cmd/devmgr.

use tracing::debug;

use crate::error::Error;
use crate::session::client::SessionClient;
use crate::session::models::{DeviceUpdate, LegacyDevice, PowerCycleCommand};

impl SessionClient {
    /// List all devices of a site, including port tables and overrides.
    ///
    /// `GET api/s/{site}/stat/device`
    pub async fn list_devices(&self, site: &str) -> Result<Vec<LegacyDevice>, Error> {
        debug!(site, "listing devices");
        self.get(&format!("api/s/{site}/stat/device")).await
    }

    /// Write partial device state (typically the full `port_overrides` list).
    ///
    /// `PUT api/s/{site}/rest/device/{device_id}`
    pub async fn update_device(
        &self,
        site: &str,
        device_id: &str,
        update: &DeviceUpdate,
    ) -> Result<Vec<serde_json::Value>, Error> {
        debug!(site, device_id, "updating device");
        self.put(&format!("api/s/{site}/rest/device/{device_id}"), update)
            .await
    }

    /// Power-cycle a PoE port.
    ///
    /// `POST api/s/{site}/cmd/devmgr` with `{"cmd": "power-cycle", "mac": "...", "port_idx": "N"}`
    pub async fn power_cycle_port(
        &self,
        site: &str,
        command: &PowerCycleCommand,
    ) -> Result<Vec<serde_json::Value>, Error> {
        debug!(site, mac = %command.mac, port_idx = %command.port_idx, "power-cycling port");
        self.post(&format!("api/s/{site}/cmd/devmgr"), command).await
    }
}
