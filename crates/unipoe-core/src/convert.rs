// ── API-to-domain type conversions ──
//
// Bridges `unipoe_api` wire types into `crate::model`. MACs are
// normalized here; port overrides stay wire objects.

use unipoe_api::{LegacyDevice, LegacyPort, LegacySite};

use crate::model::{Device, MacAddress, Port, Site};

impl From<LegacySite> for Site {
    fn from(raw: LegacySite) -> Self {
        Self {
            name: raw.name,
            description: raw.desc.filter(|d| !d.is_empty()),
        }
    }
}

impl From<LegacyPort> for Port {
    fn from(raw: LegacyPort) -> Self {
        Self {
            idx: raw.port_idx,
            name: raw.name,
            poe_mode: raw.poe_mode,
            portconf_id: raw.portconf_id,
        }
    }
}

impl From<LegacyDevice> for Device {
    fn from(raw: LegacyDevice) -> Self {
        Self {
            id: raw.id,
            mac: MacAddress::new(&raw.mac),
            name: raw.name.filter(|n| !n.is_empty()),
            model: raw.model,
            ports: raw.port_table.into_iter().map(Port::from).collect(),
            port_overrides: raw.port_overrides,
        }
    }
}
