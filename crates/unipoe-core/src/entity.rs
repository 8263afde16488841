// ── Controllable port entity ──
//
// One registry entity per identity key. Holds the displayed on/off value,
// guards it against stale polls while a toggle is pending, and turns
// bursts of toggles into a single debounced controller write.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::{ControlledPortSpec, PortMode};
use crate::error::{CoreError, WriteOperation};
use crate::gateway::Gateway;
use crate::model::device::POE_OFF;
use crate::model::{Device, EntityHandle, IdentityKey, Port, Site};
use crate::registry::{EntityContext, EntityMetadata, EntityRegistry};

pub const MANUFACTURER: &str = "Ubiquiti";

/// Where the port was last seen by a poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub site: String,
    pub device_id: String,
}

/// Entity name for a spec: the configured name, else the port's name
/// (suffixed for power-cycle entities).
pub fn display_name(spec: &ControlledPortSpec, port: &Port) -> String {
    if let Some(name) = &spec.name {
        return name.clone();
    }
    match spec.mode {
        PortMode::Auto => port.display_name(),
        PortMode::PowerCycle => format!("{} - PowerCycle", port.display_name()),
    }
}

pub struct PortEntity<G, R> {
    spec: ControlledPortSpec,
    key: IdentityKey,
    handle: EntityHandle,
    gateway: Arc<G>,
    registry: Arc<R>,
    debounce: Duration,
    name: ArcSwap<String>,
    placement: ArcSwapOption<Placement>,
    on: AtomicBool,
    desired: AtomicBool,
    pending: AtomicBool,
    /// Bumped by every `set`; a scheduled write only fires for the latest.
    generation: AtomicU64,
    scheduled: Mutex<Option<JoinHandle<()>>>,
    /// Held for the duration of a controller write.
    write_lock: tokio::sync::Mutex<()>,
}

impl<G: Gateway, R: EntityRegistry> PortEntity<G, R> {
    pub fn new(
        spec: ControlledPortSpec,
        name: String,
        gateway: Arc<G>,
        registry: Arc<R>,
        debounce: Duration,
        on: bool,
    ) -> Self {
        let key = spec.key();
        Self {
            handle: key.handle(),
            key,
            spec,
            gateway,
            registry,
            debounce,
            name: ArcSwap::from_pointee(name),
            placement: ArcSwapOption::empty(),
            on: AtomicBool::new(on),
            desired: AtomicBool::new(on),
            pending: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            scheduled: Mutex::new(None),
            write_lock: tokio::sync::Mutex::new(()),
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn key(&self) -> &IdentityKey {
        &self.key
    }

    pub fn handle(&self) -> EntityHandle {
        self.handle
    }

    pub fn name(&self) -> String {
        (**self.name.load()).clone()
    }

    pub fn is_on(&self) -> bool {
        self.on.load(Ordering::Acquire)
    }

    pub fn is_change_pending(&self) -> bool {
        self.pending.load(Ordering::Acquire)
    }

    pub fn placement(&self) -> Option<Placement> {
        self.placement.load().as_deref().cloned()
    }

    pub fn context(&self) -> EntityContext {
        EntityContext {
            key: self.key.clone(),
            last_on: self.is_on(),
        }
    }

    // ── Poll-driven refresh ──────────────────────────────────────────

    /// Refresh metadata and, unless a toggle is pending, the displayed value.
    pub fn update(&self, site: &Site, device: &Device, port: &Port) {
        self.placement.store(Some(Arc::new(Placement {
            site: site.name.clone(),
            device_id: device.id.clone(),
        })));

        let name = display_name(&self.spec, port);
        self.name.store(Arc::new(name.clone()));

        match self.key.mode {
            PortMode::PowerCycle => self.show(false),
            PortMode::Auto if !self.is_change_pending() => {
                self.show(device.is_port_powered(self.key.port_idx));
            }
            PortMode::Auto => {
                debug!(key = %self.key, "change pending, keeping local value");
            }
        }

        let metadata = EntityMetadata {
            name,
            manufacturer: MANUFACTURER.to_owned(),
            model: device.display_name(),
            serial: self.key.serial(),
        };
        self.registry
            .update_entity(self.handle, &metadata, &self.context());
    }

    fn show(&self, on: bool) {
        if self.on.swap(on, Ordering::AcqRel) != on {
            self.registry.notify_value_changed(self.handle, on);
        }
    }

    // ── User toggles ─────────────────────────────────────────────────

    /// Accept a toggle and schedule the debounced write. Returns at once.
    ///
    /// A toggle within the debounce window of the previous one replaces
    /// it; only the last value reaches the controller.
    pub fn set(self: &Arc<Self>, on: bool) {
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        self.desired.store(on, Ordering::Release);
        self.pending.store(true, Ordering::Release);
        self.on.store(on, Ordering::Release);

        let this = Arc::clone(self);
        let task = tokio::spawn(async move { this.debounced_write(generation).await });

        let previous = self
            .scheduled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
        debug!(key = %self.key, on, generation, "write scheduled");
    }

    /// Wait until the scheduled write, if any, has finished.
    pub async fn settle(&self) {
        let scheduled = self
            .scheduled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = scheduled {
            let _ = task.await;
        }
        let _idle = self.write_lock.lock().await;
    }

    /// Drop any scheduled write that has not started yet.
    pub fn cancel_pending(&self) {
        let scheduled = self
            .scheduled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(task) = scheduled {
            task.abort();
        }
    }

    async fn debounced_write(&self, generation: u64) {
        tokio::time::sleep(self.debounce).await;

        let _writing = self.write_lock.lock().await;
        if self.generation.load(Ordering::Acquire) != generation {
            return;
        }
        // Detach: a later `set` must not abort a write already in flight.
        drop(
            self.scheduled
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take(),
        );

        let on = self.desired.load(Ordering::Acquire);
        if let Err(e) = self.write(on).await {
            match e.response_body() {
                Some(body) => error!(key = %self.key, error = %e, body, "port write failed"),
                None => error!(key = %self.key, error = %e, "port write failed"),
            }
        }

        if self.generation.load(Ordering::Acquire) == generation {
            self.pending.store(false, Ordering::Release);
        }
    }

    // ── Controller write ─────────────────────────────────────────────

    async fn write(&self, on: bool) -> Result<(), CoreError> {
        let Some(placement) = self.placement.load_full() else {
            warn!(key = %self.key, "port not observed on the controller yet, dropping write");
            return Ok(());
        };
        let site = placement.site.as_str();
        let port_idx = self.key.port_idx;

        let devices = self
            .gateway
            .list_devices(site)
            .await
            .map_err(|source| self.write_error(&placement.device_id, WriteOperation::FetchDevice, source))?;

        let Some(device) = devices.into_iter().find(|d| d.mac == self.key.mac) else {
            warn!(
                device_id = %placement.device_id,
                mac = %self.key.mac,
                site,
                "device no longer exists, dropping write"
            );
            return Ok(());
        };

        match self.key.mode {
            PortMode::Auto => {
                let poe_mode = if on {
                    self.spec.poe_on_mode.as_str()
                } else {
                    POE_OFF
                };
                let overrides = device.overrides_with_poe_mode(port_idx, poe_mode);
                info!(
                    device_id = %device.id,
                    mac = %device.mac,
                    site,
                    port_idx,
                    poe_mode,
                    "updating port overrides"
                );
                self.gateway
                    .update_port_overrides(site, &device.id, overrides)
                    .await
                    .map_err(|source| {
                        self.write_error(&device.id, WriteOperation::UpdatePortOverrides, source)
                    })?;
            }
            PortMode::PowerCycle => {
                // Momentary command: the switch always returns to off.
                self.show(false);
                if !on {
                    return Ok(());
                }
                if !device.is_port_powered(port_idx) {
                    info!(
                        device_id = %device.id,
                        mac = %device.mac,
                        port_idx,
                        "PoE is off, power-cycle not available"
                    );
                    return Ok(());
                }
                info!(device_id = %device.id, mac = %device.mac, site, port_idx, "power-cycling port");
                self.gateway
                    .power_cycle_port(site, &device.mac, port_idx)
                    .await
                    .map_err(|source| self.write_error(&device.id, WriteOperation::PowerCycle, source))?;
            }
        }
        Ok(())
    }

    fn write_error(
        &self,
        device_id: &str,
        operation: WriteOperation,
        source: unipoe_api::Error,
    ) -> CoreError {
        CoreError::Write {
            device_id: device_id.to_owned(),
            mac: self.key.mac.clone(),
            operation,
            source,
        }
    }
}
