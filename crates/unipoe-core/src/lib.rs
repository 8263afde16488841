//! Reconciliation engine between `unipoe-api` and an entity registry.
//!
//! - **[`Reconciler`]** polls the controller through a [`Gateway`], matches
//!   devices and ports against the configured [`ControlledPortSpec`]s and
//!   keeps exactly one [`PortEntity`] per [`IdentityKey`] registered with
//!   the host's [`EntityRegistry`].
//!
//! - **[`PortEntity`]** owns one switch: the displayed on/off value, the
//!   pending-change guard, and the debounced write back to the controller
//!   (PoE override change or power-cycle command).
//!
//! - **Domain model** ([`model`]) with handles derived deterministically
//!   from identity keys, so a restart reattaches to the same entities.

pub mod config;
pub mod convert;
pub mod entity;
pub mod error;
pub mod gateway;
pub mod model;
pub mod reconcile;
pub mod registry;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{ControlledPortSpec, PlatformConfig, PortMode};
pub use entity::{Placement, PortEntity};
pub use error::{CoreError, WriteOperation};
pub use gateway::Gateway;
pub use model::{Device, EntityHandle, IdentityKey, MacAddress, Port, PortOverride, Site};
pub use reconcile::{Reconciler, TickReport};
pub use registry::{EntityContext, EntityMetadata, EntityRegistry, RegisteredEntity};
