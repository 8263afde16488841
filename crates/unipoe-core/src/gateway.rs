// ── Controller gateway seam ──
//
// The reconciler and port entities talk to the controller only through
// this trait. `SessionClient` implements it by converting wire models into
// domain models; errors pass through untranslated.

use std::future::Future;

use unipoe_api::{DeviceUpdate, Error, PowerCycleCommand, SessionClient};

use crate::model::{Device, MacAddress, PortOverride, Site};

pub trait Gateway: Send + Sync + 'static {
    fn list_sites(&self) -> impl Future<Output = Result<Vec<Site>, Error>> + Send;

    fn list_devices(&self, site: &str) -> impl Future<Output = Result<Vec<Device>, Error>> + Send;

    /// Replace a device's full `port_overrides` list.
    fn update_port_overrides(
        &self,
        site: &str,
        device_id: &str,
        overrides: Vec<PortOverride>,
    ) -> impl Future<Output = Result<(), Error>> + Send;

    fn power_cycle_port(
        &self,
        site: &str,
        mac: &MacAddress,
        port_idx: u32,
    ) -> impl Future<Output = Result<(), Error>> + Send;
}

impl Gateway for SessionClient {
    async fn list_sites(&self) -> Result<Vec<Site>, Error> {
        let sites = SessionClient::list_sites(self).await?;
        Ok(sites.into_iter().map(Site::from).collect())
    }

    async fn list_devices(&self, site: &str) -> Result<Vec<Device>, Error> {
        let devices = SessionClient::list_devices(self, site).await?;
        Ok(devices.into_iter().map(Device::from).collect())
    }

    async fn update_port_overrides(
        &self,
        site: &str,
        device_id: &str,
        overrides: Vec<PortOverride>,
    ) -> Result<(), Error> {
        let update = DeviceUpdate {
            port_overrides: overrides,
            device_id: device_id.to_owned(),
        };
        self.update_device(site, device_id, &update).await?;
        Ok(())
    }

    async fn power_cycle_port(&self, site: &str, mac: &MacAddress, port_idx: u32) -> Result<(), Error> {
        let command = PowerCycleCommand::new(mac.as_str(), port_idx);
        SessionClient::power_cycle_port(self, site, &command).await?;
        Ok(())
    }
}
