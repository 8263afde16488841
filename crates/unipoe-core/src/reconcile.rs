// ── Reconciliation engine ──
//
// Maps the controller's sites/devices/ports onto the configured port
// specs. Each tick fetches everything first, then diffs against the
// tracked entities: matches are updated, new ones created and registered,
// and entities whose device vanished are unregistered in one batch.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::ControlledPortSpec;
use crate::entity::{PortEntity, display_name};
use crate::error::CoreError;
use crate::gateway::Gateway;
use crate::model::{Device, EntityHandle, IdentityKey, MacAddress, Port, Site};
use crate::registry::{EntityRegistry, RegisteredEntity};

/// Counts from one reconciliation tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub sites: usize,
    pub devices: usize,
    pub created: usize,
    pub updated: usize,
    pub removed: usize,
    /// Specs whose port index is missing on a present device.
    pub skipped: usize,
}

pub struct Reconciler<G, R> {
    gateway: Arc<G>,
    registry: Arc<R>,
    specs: Vec<ControlledPortSpec>,
    debounce: Duration,
    tracked: HashMap<IdentityKey, Arc<PortEntity<G, R>>>,
}

impl<G: Gateway, R: EntityRegistry> Reconciler<G, R> {
    pub fn new(
        gateway: Arc<G>,
        registry: Arc<R>,
        specs: Vec<ControlledPortSpec>,
        debounce: Duration,
    ) -> Self {
        Self {
            gateway,
            registry,
            specs,
            debounce,
            tracked: HashMap::new(),
        }
    }

    // ── Lookups ──────────────────────────────────────────────────────

    pub fn entities(&self) -> impl Iterator<Item = &Arc<PortEntity<G, R>>> {
        self.tracked.values()
    }

    pub fn entity(&self, handle: EntityHandle) -> Option<Arc<PortEntity<G, R>>> {
        self.tracked
            .values()
            .find(|e| e.handle() == handle)
            .map(Arc::clone)
    }

    pub fn entity_by_key(&self, key: &IdentityKey) -> Option<Arc<PortEntity<G, R>>> {
        self.tracked.get(key).map(Arc::clone)
    }

    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    pub fn specs(&self) -> &[ControlledPortSpec] {
        &self.specs
    }

    // ── Startup reattachment ─────────────────────────────────────────

    /// Reattach entities registered by a previous run.
    ///
    /// Entries with a context matching a configured spec become tracked
    /// entities without being registered again. Everything else is
    /// unregistered in one batch. Returns the number reattached.
    pub fn restore(&mut self, cached: Vec<RegisteredEntity>) -> usize {
        let mut stale = Vec::new();
        let mut restored = 0;

        for entry in cached {
            let spec = entry
                .context
                .as_ref()
                .and_then(|ctx| self.specs.iter().find(|s| s.key() == ctx.key));

            match (spec, entry.context) {
                (Some(spec), Some(ctx))
                    if ctx.key.handle() == entry.handle && !self.tracked.contains_key(&ctx.key) =>
                {
                    debug!(key = %ctx.key, handle = %entry.handle, "reattaching cached entity");
                    let entity = PortEntity::new(
                        spec.clone(),
                        entry.name,
                        Arc::clone(&self.gateway),
                        Arc::clone(&self.registry),
                        self.debounce,
                        ctx.last_on,
                    );
                    self.tracked.insert(ctx.key, Arc::new(entity));
                    restored += 1;
                }
                _ => stale.push(entry.handle),
            }
        }

        if !stale.is_empty() {
            info!(count = stale.len(), "unregistering cached entities without a configured port");
            self.registry.unregister_entities(&stale);
        }
        restored
    }

    // ── Tick ─────────────────────────────────────────────────────────

    /// Run one reconciliation pass.
    ///
    /// A failed fetch returns the error before anything is diffed, leaving
    /// the tracked set unchanged.
    pub async fn tick(&mut self) -> Result<TickReport, CoreError> {
        let sites = self.gateway.list_sites().await?;

        let mut snapshot = Vec::with_capacity(sites.len());
        for site in sites {
            let devices = self.gateway.list_devices(&site.name).await?;
            debug!(site = %site.name, count = devices.len(), "fetched devices");
            snapshot.push((site, devices));
        }

        Ok(self.apply(&snapshot))
    }

    fn apply(&mut self, snapshot: &[(Site, Vec<Device>)]) -> TickReport {
        let mut report = TickReport {
            sites: snapshot.len(),
            ..TickReport::default()
        };
        let mut previous = std::mem::take(&mut self.tracked);
        let mut found: HashMap<IdentityKey, Arc<PortEntity<G, R>>> = HashMap::new();
        let mut seen: HashMap<MacAddress, &str> = HashMap::new();

        for (site, devices) in snapshot {
            for device in devices {
                report.devices += 1;
                if let Some(first_site) = seen.get(&device.mac) {
                    warn!(
                        mac = %device.mac,
                        site = %site.name,
                        first_site,
                        "device reported by more than one site, using the first"
                    );
                    continue;
                }
                seen.insert(device.mac.clone(), &site.name);

                for spec in self.specs.iter().filter(|s| s.mac == device.mac) {
                    let key = spec.key();
                    if found.contains_key(&key) {
                        continue;
                    }

                    let Some(port) = device.port(spec.port_idx) else {
                        let mismatch = CoreError::ConfigMismatch {
                            mac: device.mac.clone(),
                            port_idx: spec.port_idx,
                        };
                        warn!(
                            error = %mismatch,
                            site = %site.name,
                            device_id = %device.id,
                            model = device.model.as_deref().unwrap_or_default(),
                            "port config is wrong, skipping"
                        );
                        report.skipped += 1;
                        if let Some(existing) = previous.remove(&key) {
                            found.insert(key, existing);
                        }
                        continue;
                    };

                    let entity = if let Some(existing) = previous.remove(&key) {
                        report.updated += 1;
                        existing
                    } else {
                        report.created += 1;
                        self.create(spec, port)
                    };
                    entity.update(site, device, port);
                    found.insert(key, entity);
                }
            }
        }

        report.removed = previous.len();
        if !previous.is_empty() {
            let handles: Vec<EntityHandle> = previous
                .values()
                .map(|entity| {
                    entity.cancel_pending();
                    info!(key = %entity.key(), handle = %entity.handle(), "removing entity");
                    entity.handle()
                })
                .collect();
            self.registry.unregister_entities(&handles);
        }

        self.tracked = found;
        debug!(?report, tracked = self.tracked.len(), "reconciliation complete");
        report
    }

    fn create(&self, spec: &ControlledPortSpec, port: &Port) -> Arc<PortEntity<G, R>> {
        let name = display_name(spec, port);
        let handle = spec.key().handle();
        let known = self.registry.find_entity(handle);
        let last_on = known
            .as_ref()
            .and_then(|r| r.context.as_ref())
            .is_some_and(|ctx| ctx.last_on);

        if known.is_some() {
            debug!(key = %spec.key(), %handle, "reattaching to registered entity");
        } else {
            info!(key = %spec.key(), %handle, name, "setting up new entity");
            self.registry.create_entity(handle, &name);
            self.registry.register_entities(&[handle]);
        }

        Arc::new(PortEntity::new(
            spec.clone(),
            name,
            Arc::clone(&self.gateway),
            Arc::clone(&self.registry),
            self.debounce,
            last_on,
        ))
    }

    // ── Poll loop ────────────────────────────────────────────────────

    /// Tick, sleep `interval`, repeat until `cancel` fires.
    ///
    /// A failed tick is logged and the loop carries on. Cancellation is
    /// observed between ticks only; a running tick always completes.
    pub async fn run(&mut self, interval: Duration, cancel: CancellationToken) {
        loop {
            match self.tick().await {
                Ok(report) => debug!(?report, "tick finished"),
                Err(e) => warn!(error = %e, "reconciliation tick failed"),
            }

            tokio::select! {
                biased;
                () = cancel.cancelled() => break,
                () = tokio::time::sleep(interval) => {}
            }
        }
        debug!("poll loop stopped");
    }

    /// Wait for every entity's scheduled write to finish.
    pub async fn settle(&self) {
        for entity in self.tracked.values() {
            entity.settle().await;
        }
    }
}
