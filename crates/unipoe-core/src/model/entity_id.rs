// ── Core identity types ──
//
// MacAddress identifies a device across polls and sites; IdentityKey
// identifies one controlled port; EntityHandle is the registry-facing
// identifier derived from it.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::PortMode;

// ── MacAddress ──────────────────────────────────────────────────────

/// MAC address, normalized to lowercase colon-separated format (aa:bb:cc:dd:ee:ff).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct MacAddress(String);

impl MacAddress {
    /// Create a normalized MAC address from any common format.
    /// Accepts colon-separated, dash-separated, or bare hex.
    pub fn new(raw: impl AsRef<str>) -> Self {
        let lower = raw.as_ref().trim().to_lowercase().replace('-', ":");
        if lower.len() == 12 && lower.chars().all(|c| c.is_ascii_hexdigit()) {
            let pairs: Vec<&str> = (0..6).filter_map(|i| lower.get(i * 2..i * 2 + 2)).collect();
            return Self(pairs.join(":"));
        }
        Self(lower)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Six colon-separated hex octets.
    pub fn is_well_formed(&self) -> bool {
        let octets: Vec<&str> = self.0.split(':').collect();
        octets.len() == 6
            && octets
                .iter()
                .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for MacAddress {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<String> for MacAddress {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<MacAddress> for String {
    fn from(mac: MacAddress) -> Self {
        mac.0
    }
}

// ── IdentityKey ─────────────────────────────────────────────────────

/// `(mac, port_idx, mode)`: the identity of one controlled port.
///
/// The same physical port tracked under two modes yields two keys.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct IdentityKey {
    pub mac: MacAddress,
    pub port_idx: u32,
    pub mode: PortMode,
}

impl IdentityKey {
    pub fn new(mac: MacAddress, port_idx: u32, mode: PortMode) -> Self {
        Self {
            mac,
            port_idx,
            mode,
        }
    }

    /// Serial-number style rendering: `mac-idx`, with `-pc` for power-cycle keys.
    pub fn serial(&self) -> String {
        match self.mode {
            PortMode::Auto => format!("{}-{}", self.mac, self.port_idx),
            PortMode::PowerCycle => format!("{}-{}-pc", self.mac, self.port_idx),
        }
    }

    pub fn handle(&self) -> EntityHandle {
        EntityHandle::for_key(self)
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{} ({})", self.mac, self.port_idx, self.mode)
    }
}

// ── EntityHandle ────────────────────────────────────────────────────

/// Namespace for handle derivation. Changing it orphans every registered entity.
const HANDLE_NAMESPACE: Uuid = Uuid::from_u128(0x6a1f_3c52_9e0b_4d1a_8f27_0c4e_55b1_d9a3);

/// Opaque registry identifier, a UUIDv5 of the identity key's serial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityHandle(Uuid);

impl EntityHandle {
    pub fn for_key(key: &IdentityKey) -> Self {
        Self(Uuid::new_v5(&HANDLE_NAMESPACE, key.serial().as_bytes()))
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for EntityHandle {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}
