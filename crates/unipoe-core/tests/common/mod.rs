// Shared fixtures: an in-memory controller and a registry that records
// every call made to it.
#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use unipoe_api::Error;
use unipoe_core::{
    ControlledPortSpec, Device, EntityContext, EntityHandle, EntityMetadata, EntityRegistry,
    Gateway, MacAddress, Port, PortMode, PortOverride, Reconciler, RegisteredEntity, Site,
};

pub const MAC: &str = "AA:BB:CC:DD:EE:01";
pub const DEBOUNCE: Duration = Duration::from_secs(1);

// ── Builders ────────────────────────────────────────────────────────

pub fn site(name: &str) -> Site {
    Site {
        name: name.to_owned(),
        description: None,
    }
}

pub fn port(idx: u32, poe_mode: Option<&str>) -> Port {
    Port {
        idx,
        name: Some(format!("Port {idx}")),
        poe_mode: poe_mode.map(str::to_owned),
        portconf_id: Some(format!("conf-{idx}")),
    }
}

pub fn port_override(idx: u32, poe_mode: &str) -> PortOverride {
    PortOverride {
        port_idx: idx,
        poe_mode: Some(poe_mode.to_owned()),
        portconf_id: None,
        extra: serde_json::Map::new(),
    }
}

pub fn switch(mac: &str, ports: Vec<Port>, overrides: Vec<PortOverride>) -> Device {
    Device {
        id: format!("dev-{}", MacAddress::new(mac)),
        mac: MacAddress::new(mac),
        name: Some("Garage Switch".into()),
        model: Some("USW-Lite-8-PoE".into()),
        ports,
        port_overrides: overrides,
    }
}

pub fn spec(mac: &str, port_idx: u32, mode: PortMode) -> ControlledPortSpec {
    ControlledPortSpec::new(MacAddress::new(mac), port_idx, mode)
}

pub fn reconciler(
    gateway: &Arc<FakeGateway>,
    registry: &Arc<RecordingRegistry>,
    specs: Vec<ControlledPortSpec>,
) -> Reconciler<FakeGateway, RecordingRegistry> {
    Reconciler::new(Arc::clone(gateway), Arc::clone(registry), specs, DEBOUNCE)
}

// ── Fake gateway ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    ListSites,
    ListDevices(String),
    UpdatePortOverrides {
        site: String,
        device_id: String,
        overrides: Vec<PortOverride>,
    },
    PowerCycle {
        site: String,
        mac: MacAddress,
        port_idx: u32,
    },
}

#[derive(Default)]
struct ControllerState {
    sites: Vec<Site>,
    devices: HashMap<String, Vec<Device>>,
    fail_sites: bool,
    fail_devices: bool,
    fail_writes: bool,
    calls: Vec<Call>,
}

#[derive(Default)]
pub struct FakeGateway {
    state: Mutex<ControllerState>,
}

impl FakeGateway {
    /// A controller with a single site holding `devices`.
    pub fn with_devices(devices: Vec<Device>) -> Arc<Self> {
        let gateway = Arc::new(Self::default());
        gateway.set_site_devices("default", devices);
        gateway
    }

    pub fn set_site_devices(&self, site_name: &str, devices: Vec<Device>) {
        let mut state = self.state.lock().unwrap();
        if !state.sites.iter().any(|s| s.name == site_name) {
            state.sites.push(site(site_name));
        }
        state.devices.insert(site_name.to_owned(), devices);
    }

    pub fn fail_sites(&self, fail: bool) {
        self.state.lock().unwrap().fail_sites = fail;
    }

    pub fn fail_devices(&self, fail: bool) {
        self.state.lock().unwrap().fail_devices = fail;
    }

    pub fn fail_writes(&self, fail: bool) {
        self.state.lock().unwrap().fail_writes = fail;
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    /// Only the calls that change controller state.
    pub fn writes(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| matches!(c, Call::UpdatePortOverrides { .. } | Call::PowerCycle { .. }))
            .collect()
    }

    pub fn device(&self, site_name: &str, mac: &str) -> Option<Device> {
        let mac = MacAddress::new(mac);
        self.state
            .lock()
            .unwrap()
            .devices
            .get(site_name)
            .and_then(|devs| devs.iter().find(|d| d.mac == mac).cloned())
    }
}

fn server_error() -> Error {
    Error::Api {
        status: 500,
        body: "{\"meta\":{\"rc\":\"error\",\"msg\":\"api.err.Internal\"}}".into(),
    }
}

impl Gateway for FakeGateway {
    async fn list_sites(&self) -> Result<Vec<Site>, Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListSites);
        if state.fail_sites {
            return Err(Error::LegacyApi {
                message: "api.err.LoginRequired".into(),
            });
        }
        Ok(state.sites.clone())
    }

    async fn list_devices(&self, site: &str) -> Result<Vec<Device>, Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListDevices(site.to_owned()));
        if state.fail_devices {
            return Err(server_error());
        }
        Ok(state.devices.get(site).cloned().unwrap_or_default())
    }

    async fn update_port_overrides(
        &self,
        site: &str,
        device_id: &str,
        overrides: Vec<PortOverride>,
    ) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::UpdatePortOverrides {
            site: site.to_owned(),
            device_id: device_id.to_owned(),
            overrides: overrides.clone(),
        });
        if state.fail_writes {
            return Err(server_error());
        }
        if let Some(device) = state
            .devices
            .get_mut(site)
            .and_then(|devs| devs.iter_mut().find(|d| d.id == device_id))
        {
            device.port_overrides = overrides;
        }
        Ok(())
    }

    async fn power_cycle_port(&self, site: &str, mac: &MacAddress, port_idx: u32) -> Result<(), Error> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::PowerCycle {
            site: site.to_owned(),
            mac: mac.clone(),
            port_idx,
        });
        if state.fail_writes {
            return Err(server_error());
        }
        Ok(())
    }
}

// ── Recording registry ──────────────────────────────────────────────

#[derive(Default)]
struct RegistryState {
    created: Vec<(EntityHandle, String)>,
    registered: BTreeSet<EntityHandle>,
    register_calls: Vec<Vec<EntityHandle>>,
    unregister_calls: Vec<Vec<EntityHandle>>,
    metadata: HashMap<EntityHandle, EntityMetadata>,
    contexts: HashMap<EntityHandle, EntityContext>,
    notifications: Vec<(EntityHandle, bool)>,
    cached: Vec<RegisteredEntity>,
}

#[derive(Default)]
pub struct RecordingRegistry {
    state: Mutex<RegistryState>,
}

impl RecordingRegistry {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// A registry that already holds `cached` from a previous run.
    pub fn with_cached(cached: Vec<RegisteredEntity>) -> Arc<Self> {
        let registry = Self::default();
        {
            let mut state = registry.state.lock().unwrap();
            for entry in &cached {
                state.registered.insert(entry.handle);
                if let Some(ctx) = &entry.context {
                    state.contexts.insert(entry.handle, ctx.clone());
                }
            }
            state.cached = cached;
        }
        Arc::new(registry)
    }

    pub fn registered(&self) -> BTreeSet<EntityHandle> {
        self.state.lock().unwrap().registered.clone()
    }

    pub fn created(&self) -> Vec<(EntityHandle, String)> {
        self.state.lock().unwrap().created.clone()
    }

    pub fn register_calls(&self) -> Vec<Vec<EntityHandle>> {
        self.state.lock().unwrap().register_calls.clone()
    }

    pub fn unregister_calls(&self) -> Vec<Vec<EntityHandle>> {
        self.state.lock().unwrap().unregister_calls.clone()
    }

    pub fn metadata(&self, handle: EntityHandle) -> Option<EntityMetadata> {
        self.state.lock().unwrap().metadata.get(&handle).cloned()
    }

    pub fn context(&self, handle: EntityHandle) -> Option<EntityContext> {
        self.state.lock().unwrap().contexts.get(&handle).cloned()
    }

    pub fn notifications(&self) -> Vec<(EntityHandle, bool)> {
        self.state.lock().unwrap().notifications.clone()
    }
}

impl EntityRegistry for RecordingRegistry {
    fn create_entity(&self, handle: EntityHandle, name: &str) {
        self.state
            .lock()
            .unwrap()
            .created
            .push((handle, name.to_owned()));
    }

    fn find_entity(&self, handle: EntityHandle) -> Option<RegisteredEntity> {
        let state = self.state.lock().unwrap();
        state.registered.contains(&handle).then(|| RegisteredEntity {
            handle,
            name: state
                .metadata
                .get(&handle)
                .map(|m| m.name.clone())
                .unwrap_or_default(),
            context: state.contexts.get(&handle).cloned(),
        })
    }

    fn register_entities(&self, handles: &[EntityHandle]) {
        let mut state = self.state.lock().unwrap();
        state.registered.extend(handles.iter().copied());
        state.register_calls.push(handles.to_vec());
    }

    fn unregister_entities(&self, handles: &[EntityHandle]) {
        let mut state = self.state.lock().unwrap();
        for handle in handles {
            state.registered.remove(handle);
            state.contexts.remove(handle);
        }
        state.unregister_calls.push(handles.to_vec());
    }

    fn update_entity(&self, handle: EntityHandle, metadata: &EntityMetadata, context: &EntityContext) {
        let mut state = self.state.lock().unwrap();
        state.metadata.insert(handle, metadata.clone());
        state.contexts.insert(handle, context.clone());
    }

    fn notify_value_changed(&self, handle: EntityHandle, on: bool) {
        self.state.lock().unwrap().notifications.push((handle, on));
    }

    fn cached_entities(&self) -> Vec<RegisteredEntity> {
        self.state.lock().unwrap().cached.clone()
    }
}
