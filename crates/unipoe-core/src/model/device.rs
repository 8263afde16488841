// ── Device domain type ──
//
// A switch (or any PoE-capable device) as seen by one poll: live port
// table plus the persisted per-port overrides. Overrides are authoritative
// and are carried as wire objects so unknown settings survive a write.

use serde::{Deserialize, Serialize};

use super::entity_id::MacAddress;
use unipoe_api::PortOverride;

/// PoE mode value that means "disabled".
pub const POE_OFF: &str = "off";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Device {
    /// Controller object id, used for `rest/device/{id}` writes.
    pub id: String,
    pub mac: MacAddress,
    pub name: Option<String>,
    pub model: Option<String>,
    pub ports: Vec<Port>,
    pub port_overrides: Vec<PortOverride>,
}

/// One entry of the live port table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Port {
    pub idx: u32,
    pub name: Option<String>,
    pub poe_mode: Option<String>,
    pub portconf_id: Option<String>,
}

impl Port {
    /// The port name, or `Port N` when the controller has none.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| format!("Port {}", self.idx))
    }
}

impl Device {
    pub fn port(&self, idx: u32) -> Option<&Port> {
        self.ports.iter().find(|p| p.idx == idx)
    }

    pub fn port_override(&self, idx: u32) -> Option<&PortOverride> {
        self.port_overrides.iter().find(|o| o.port_idx == idx)
    }

    /// Device name, falling back to the model, then the MAC.
    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .or_else(|| self.model.clone())
            .unwrap_or_else(|| self.mac.to_string())
    }

    /// The PoE mode in effect for a port: the override's if one exists,
    /// otherwise the port table's.
    pub fn effective_poe_mode(&self, idx: u32) -> Option<&str> {
        match self.port_override(idx) {
            Some(ovr) => ovr.poe_mode.as_deref(),
            None => self.port(idx).and_then(|p| p.poe_mode.as_deref()),
        }
    }

    /// Whether PoE is enabled on a port. No reported mode counts as off.
    pub fn is_port_powered(&self, idx: u32) -> bool {
        self.effective_poe_mode(idx).is_some_and(|mode| mode != POE_OFF)
    }

    /// A copy of the override list with this port's PoE mode set to `poe_mode`.
    ///
    /// An existing override is edited in place; otherwise one is appended,
    /// carrying the port table's `portconf_id`.
    pub fn overrides_with_poe_mode(&self, idx: u32, poe_mode: &str) -> Vec<PortOverride> {
        let mut overrides = self.port_overrides.clone();
        if let Some(existing) = overrides.iter_mut().find(|o| o.port_idx == idx) {
            existing.poe_mode = Some(poe_mode.to_owned());
        } else {
            overrides.push(PortOverride {
                port_idx: idx,
                poe_mode: Some(poe_mode.to_owned()),
                portconf_id: self.port(idx).and_then(|p| p.portconf_id.clone()),
                extra: serde_json::Map::new(),
            });
        }
        overrides
    }
}
