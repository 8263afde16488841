// ── File-backed entity registry ──
//
// Registered entities, their metadata and their last value live in one
// JSON document, so a restarted daemon reattaches to the same handles
// instead of registering duplicates.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use unipoe_core::{
    EntityContext, EntityHandle, EntityMetadata, EntityRegistry, RegisteredEntity,
};

use crate::error::CliError;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StateDocument {
    #[serde(default)]
    entities: Vec<StoredEntity>,
}

/// One registered entity as written to the state file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntity {
    pub handle: EntityHandle,
    pub name: String,
    #[serde(default)]
    pub metadata: Option<EntityMetadata>,
    #[serde(default)]
    pub context: Option<EntityContext>,
}

impl StoredEntity {
    fn new(handle: EntityHandle, name: String) -> Self {
        Self {
            handle,
            name,
            metadata: None,
            context: None,
        }
    }

    fn to_registered(&self) -> RegisteredEntity {
        RegisteredEntity {
            handle: self.handle,
            name: self.name.clone(),
            context: self.context.clone(),
        }
    }

    /// Returns `true` if anything changed.
    fn apply(&mut self, metadata: &EntityMetadata, context: &EntityContext) -> bool {
        if self.metadata.as_ref() == Some(metadata) && self.context.as_ref() == Some(context) {
            return false;
        }
        self.name.clone_from(&metadata.name);
        self.metadata = Some(metadata.clone());
        self.context = Some(context.clone());
        true
    }
}

#[derive(Default)]
struct RegistryState {
    /// Created but not yet registered; never persisted.
    pending: BTreeMap<EntityHandle, StoredEntity>,
    registered: BTreeMap<EntityHandle, StoredEntity>,
    /// What the file held when it was opened.
    cached: Vec<RegisteredEntity>,
}

pub struct FileRegistry {
    path: PathBuf,
    state: Mutex<RegistryState>,
}

impl FileRegistry {
    /// Load `path`; a missing file is an empty registry.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, CliError> {
        let path = path.into();
        let document = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str::<StateDocument>(&raw).map_err(|e| {
                CliError::StateFile {
                    path: path.clone(),
                    source: Box::new(e),
                }
            })?,
            Err(e) if e.kind() == io::ErrorKind::NotFound => StateDocument::default(),
            Err(e) => {
                return Err(CliError::StateFile {
                    path,
                    source: Box::new(e),
                });
            }
        };

        debug!(path = %path.display(), count = document.entities.len(), "loaded entity state");
        let cached = document
            .entities
            .iter()
            .map(StoredEntity::to_registered)
            .collect();
        let registered = document
            .entities
            .into_iter()
            .map(|e| (e.handle, e))
            .collect();

        Ok(Self {
            path,
            state: Mutex::new(RegistryState {
                pending: BTreeMap::new(),
                registered,
                cached,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of every registered entity.
    #[cfg(test)]
    pub fn entities(&self) -> Vec<StoredEntity> {
        self.lock().registered.values().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn persist(&self, state: &RegistryState) {
        if let Err(err) = write_document(&self.path, state) {
            warn!(path = %self.path.display(), error = %err, "failed to save entity state");
        }
    }
}

fn write_document(path: &Path, state: &RegistryState) -> io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let document = StateDocument {
        entities: state.registered.values().cloned().collect(),
    };
    let json = serde_json::to_vec_pretty(&document).map_err(io::Error::other)?;

    // Write-then-rename so a crash never leaves a truncated file.
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)?;
    fs::rename(&tmp, path)
}

impl EntityRegistry for FileRegistry {
    fn create_entity(&self, handle: EntityHandle, name: &str) {
        self.lock()
            .pending
            .insert(handle, StoredEntity::new(handle, name.to_owned()));
    }

    fn find_entity(&self, handle: EntityHandle) -> Option<RegisteredEntity> {
        self.lock()
            .registered
            .get(&handle)
            .map(StoredEntity::to_registered)
    }

    fn register_entities(&self, handles: &[EntityHandle]) {
        let mut state = self.lock();
        let mut changed = false;
        for &handle in handles {
            if state.registered.contains_key(&handle) {
                continue;
            }
            let Some(entity) = state.pending.remove(&handle) else {
                warn!(%handle, "registering an entity that was never created");
                continue;
            };
            state.registered.insert(handle, entity);
            changed = true;
        }
        if changed {
            self.persist(&state);
        }
    }

    fn unregister_entities(&self, handles: &[EntityHandle]) {
        let mut state = self.lock();
        let mut changed = false;
        for handle in handles {
            state.pending.remove(handle);
            changed |= state.registered.remove(handle).is_some();
        }
        if changed {
            self.persist(&state);
        }
    }

    fn update_entity(&self, handle: EntityHandle, metadata: &EntityMetadata, context: &EntityContext) {
        let mut state = self.lock();
        if let Some(entity) = state.registered.get_mut(&handle) {
            if entity.apply(metadata, context) {
                self.persist(&state);
            }
        } else if let Some(entity) = state.pending.get_mut(&handle) {
            entity.apply(metadata, context);
        }
    }

    fn notify_value_changed(&self, handle: EntityHandle, on: bool) {
        debug!(%handle, on, "value changed");
        let mut state = self.lock();
        let Some(context) = state
            .registered
            .get_mut(&handle)
            .and_then(|e| e.context.as_mut())
        else {
            return;
        };
        if context.last_on != on {
            context.last_on = on;
            self.persist(&state);
        }
    }

    fn cached_entities(&self) -> Vec<RegisteredEntity> {
        self.lock().cached.clone()
    }
}
