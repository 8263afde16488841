// ── Core error types ──
//
// Controller errors pass through unchanged so callers see the same
// taxonomy as the session client. The extra variants cover the two
// failure modes the engine logs instead of propagating.

use strum::Display;
use thiserror::Error;

use crate::model::MacAddress;

/// The write step that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum WriteOperation {
    /// Re-fetching the device before writing.
    FetchDevice,
    /// `PUT rest/device/{id}` with updated port overrides.
    UpdatePortOverrides,
    /// `POST cmd/devmgr` power-cycle.
    PowerCycle,
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Api(#[from] unipoe_api::Error),

    /// A configured port index does not exist on the device.
    #[error("port {port_idx} does not exist on device {mac}")]
    ConfigMismatch { mac: MacAddress, port_idx: u32 },

    /// A port state write failed.
    #[error("{operation} failed for device {device_id} ({mac}): {source}")]
    Write {
        device_id: String,
        mac: MacAddress,
        operation: WriteOperation,
        #[source]
        source: unipoe_api::Error,
    },
}

impl CoreError {
    /// The controller's response body, when the failure carried one.
    pub fn response_body(&self) -> Option<&str> {
        match self {
            Self::Api(e) | Self::Write { source: e, .. } => e.response_body(),
            Self::ConfigMismatch { .. } => None,
        }
    }
}
