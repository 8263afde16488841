// Session API wire types
//
// Models for the controller's session-authenticated JSON API. All responses
// are wrapped in the `LegacyResponse<T>` envelope. Fields use
// `#[serde(default)]` liberally because the API is inconsistent about field
// presence across firmware versions, and every object keeps unknown fields
// in `extra` so read-modify-write cycles round-trip them untouched.

use serde::{Deserialize, Serialize};

// ── Response Envelope ────────────────────────────────────────────────

/// Standard response envelope:
/// ```json
/// { "meta": { "rc": "ok", "msg": "optional" }, "data": [...] }
/// ```
#[derive(Debug, Deserialize)]
pub struct LegacyResponse<T> {
    pub meta: Meta,
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Metadata from the envelope. `rc` == `"ok"` means success.
#[derive(Debug, Deserialize)]
pub struct Meta {
    pub rc: String,
    #[serde(default)]
    pub msg: Option<String>,
}

// ── Site ─────────────────────────────────────────────────────────────

/// Site object from `api/self/sites`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacySite {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub desc: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ── Device ───────────────────────────────────────────────────────────

/// Device object from `stat/device`.
///
/// Only the fields needed for port control are modelled; the rest of the
/// 100+ fields land in `extra`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyDevice {
    #[serde(rename = "_id")]
    pub id: String,
    pub mac: String,
    #[serde(rename = "type", default)]
    pub device_type: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    /// Live per-port status.
    #[serde(default)]
    pub port_table: Vec<LegacyPort>,
    /// Persisted per-port configuration, authoritative over `port_table`.
    #[serde(default)]
    pub port_overrides: Vec<PortOverride>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Entry of a device's `port_table`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LegacyPort {
    pub port_idx: u32,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub poe_mode: Option<String>,
    #[serde(default)]
    pub portconf_id: Option<String>,
    #[serde(default)]
    pub port_poe: Option<bool>,
    #[serde(default)]
    pub up: Option<bool>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Entry of a device's `port_overrides`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortOverride {
    pub port_idx: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poe_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portconf_id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

// ── Requests ─────────────────────────────────────────────────────────

/// Partial device state for `PUT rest/device/{id}`.
#[derive(Debug, Clone, Serialize)]
pub struct DeviceUpdate {
    pub port_overrides: Vec<PortOverride>,
    pub device_id: String,
}

/// `cmd/devmgr` power-cycle command. The controller expects `port_idx`
/// as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PowerCycleCommand {
    pub mac: String,
    pub port_idx: String,
    pub cmd: &'static str,
}

impl PowerCycleCommand {
    pub fn new(mac: impl Into<String>, port_idx: u32) -> Self {
        Self {
            mac: mac.into(),
            port_idx: port_idx.to_string(),
            cmd: "power-cycle",
        }
    }
}
