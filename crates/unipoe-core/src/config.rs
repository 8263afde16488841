// ── Runtime platform configuration ──
//
// These types describe which ports to control and how to reach the
// controller. They never touch disk; `unipoe-config` builds a
// `PlatformConfig` and hands it in.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use url::Url;

use unipoe_api::transport::TransportConfig;
use unipoe_api::{ControllerPlatform, Credentials, SessionClient};

use crate::error::CoreError;
use crate::model::{IdentityKey, MacAddress};

/// Default poll interval between reconciliation ticks.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_millis(60_000);
/// Default quiet period before a toggle is written to the controller.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1_000);
/// PoE mode written when an Auto port is switched on.
pub const DEFAULT_POE_ON_MODE: &str = "auto";

/// How a controlled port reacts to being switched on.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Default,
    Serialize,
    Deserialize,
    Display,
    EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PortMode {
    /// Persistent on/off through the port's PoE override.
    #[default]
    Auto,
    /// Momentary power-cycle command; the switch always reads off.
    PowerCycle,
}

/// One port the platform should expose.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ControlledPortSpec {
    pub mac: MacAddress,
    pub port_idx: u32,
    /// Display name; defaults to the controller's port name.
    pub name: Option<String>,
    pub mode: PortMode,
    /// PoE mode written when switching an Auto port on.
    pub poe_on_mode: String,
}

impl ControlledPortSpec {
    pub fn new(mac: MacAddress, port_idx: u32, mode: PortMode) -> Self {
        Self {
            mac,
            port_idx,
            name: None,
            mode,
            poe_on_mode: DEFAULT_POE_ON_MODE.to_owned(),
        }
    }

    pub fn key(&self) -> IdentityKey {
        IdentityKey::new(self.mac.clone(), self.port_idx, self.mode)
    }
}

/// Everything needed to run the platform against one controller.
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub controller: Url,
    pub credentials: Credentials,
    /// Skip the root probe when set.
    pub platform: Option<ControllerPlatform>,
    pub transport: TransportConfig,
    pub refresh_interval: Duration,
    pub debounce: Duration,
    pub ports: Vec<ControlledPortSpec>,
}

impl PlatformConfig {
    /// Build the session client for this controller. Does not log in.
    pub fn session_client(&self) -> Result<SessionClient, CoreError> {
        Ok(SessionClient::new(
            self.controller.clone(),
            self.credentials.clone(),
            self.platform,
            self.transport.clone(),
        )?)
    }
}
