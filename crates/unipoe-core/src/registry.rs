// ── Entity registry seam ──
//
// The host (smart-home bridge, state file, ...) that owns registered
// entities. The engine creates, registers and unregisters entities by
// handle and pushes metadata, context and value changes into it.

use serde::{Deserialize, Serialize};

use crate::model::{EntityHandle, IdentityKey};

/// Display metadata shown by the host for an entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityMetadata {
    pub name: String,
    pub manufacturer: String,
    /// Device name, falling back to its model.
    pub model: String,
    /// `mac-idx`, or `mac-idx-pc` for power-cycle entities.
    pub serial: String,
}

/// Persisted per-entity state, enough to reattach after a restart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityContext {
    pub key: IdentityKey,
    pub last_on: bool,
}

/// An entity the registry already knows about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredEntity {
    pub handle: EntityHandle,
    pub name: String,
    #[serde(default)]
    pub context: Option<EntityContext>,
}

/// Host-side entity registry.
///
/// Calls are synchronous and expected to be cheap; implementations that
/// persist should log their own I/O failures.
pub trait EntityRegistry: Send + Sync + 'static {
    /// Create an entity object. It is not visible until registered.
    fn create_entity(&self, handle: EntityHandle, name: &str);

    /// Look up a registered entity.
    fn find_entity(&self, handle: EntityHandle) -> Option<RegisteredEntity>;

    fn register_entities(&self, handles: &[EntityHandle]);

    fn unregister_entities(&self, handles: &[EntityHandle]);

    /// Replace an entity's metadata and persisted context.
    fn update_entity(&self, handle: EntityHandle, metadata: &EntityMetadata, context: &EntityContext);

    /// Push a new on/off value to the host.
    fn notify_value_changed(&self, handle: EntityHandle, on: bool);

    /// Every entity registered in a previous run, for reattachment.
    fn cached_entities(&self) -> Vec<RegisteredEntity>;
}
