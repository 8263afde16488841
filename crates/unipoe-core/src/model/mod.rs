// ── Domain model ──
//
// Canonical types the reconciler and port entities work with. Converted
// from `unipoe_api` wire types in `crate::convert`.

pub mod device;
pub mod entity_id;
pub mod site;

pub use device::{Device, Port};
pub use entity_id::{EntityHandle, IdentityKey, MacAddress};
pub use site::Site;

pub use unipoe_api::PortOverride;
