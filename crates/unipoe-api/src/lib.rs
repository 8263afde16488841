// unipoe-api: Async session client for UniFi controllers (classic + UniFi OS)

pub mod auth;
pub mod error;
pub mod session;
pub mod transport;

pub use auth::{ControllerPlatform, Credentials};
pub use error::Error;
pub use session::SessionClient;
pub use session::models::{
    DeviceUpdate, LegacyDevice, LegacyPort, LegacySite, PortOverride, PowerCycleCommand,
};
