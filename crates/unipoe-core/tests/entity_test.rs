#![allow(clippy::unwrap_used)]
// Debounced writes of port entities, driven on tokio's paused clock.

mod common;

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use common::{
    Call, DEBOUNCE, FakeGateway, MAC, RecordingRegistry, port, port_override, reconciler, spec,
    switch,
};
use unipoe_core::{
    ControlledPortSpec, MacAddress, PortEntity, PortMode, PortOverride, Reconciler,
};

type Engine = Reconciler<FakeGateway, RecordingRegistry>;
type Entity = PortEntity<FakeGateway, RecordingRegistry>;

async fn tracked(
    gateway: &Arc<FakeGateway>,
    registry: &Arc<RecordingRegistry>,
    port_spec: &ControlledPortSpec,
) -> (Engine, Arc<Entity>) {
    let mut engine = reconciler(gateway, registry, vec![port_spec.clone()]);
    engine.tick().await.unwrap();
    let entity = engine.entity_by_key(&port_spec.key()).unwrap();
    (engine, entity)
}

fn update_call(overrides: Vec<PortOverride>) -> Call {
    Call::UpdatePortOverrides {
        site: "default".into(),
        device_id: "dev-aa:bb:cc:dd:ee:01".into(),
        overrides,
    }
}

// ── Debounce ────────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn toggles_within_window_coalesce_into_last_value() {
    let gateway = FakeGateway::with_devices(vec![switch(MAC, vec![port(3, Some("auto"))], vec![])]);
    let registry = RecordingRegistry::new();
    let (_engine, entity) = tracked(&gateway, &registry, &spec(MAC, 3, PortMode::Auto)).await;

    entity.set(false);
    tokio::time::advance(Duration::from_millis(300)).await;
    entity.set(true);
    tokio::time::advance(Duration::from_millis(300)).await;
    entity.set(false);
    assert!(entity.is_change_pending());
    assert!(gateway.writes().is_empty(), "nothing is written inside the window");

    entity.settle().await;

    assert_eq!(
        gateway.writes(),
        vec![update_call(vec![PortOverride {
            port_idx: 3,
            poe_mode: Some("off".into()),
            portconf_id: Some("conf-3".into()),
            extra: serde_json::Map::new(),
        }])]
    );
    assert!(!entity.is_change_pending());
    assert!(!entity.is_on());
}

#[tokio::test(start_paused = true)]
async fn toggles_further_apart_than_debounce_each_write() {
    let gateway = FakeGateway::with_devices(vec![switch(MAC, vec![port(3, Some("auto"))], vec![])]);
    let registry = RecordingRegistry::new();
    let (_engine, entity) = tracked(&gateway, &registry, &spec(MAC, 3, PortMode::Auto)).await;

    entity.set(false);
    entity.settle().await;
    entity.set(true);
    entity.settle().await;

    assert_eq!(gateway.writes().len(), 2);
}

#[tokio::test(start_paused = true)]
async fn write_fires_after_debounce_without_settle() {
    let gateway = FakeGateway::with_devices(vec![switch(MAC, vec![port(3, Some("auto"))], vec![])]);
    let registry = RecordingRegistry::new();
    let (_engine, entity) = tracked(&gateway, &registry, &spec(MAC, 3, PortMode::Auto)).await;

    entity.set(false);
    tokio::time::sleep(DEBOUNCE + Duration::from_millis(10)).await;

    assert_eq!(gateway.writes().len(), 1);
    assert!(!entity.is_change_pending());
}

// ── Pending guard ───────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn poll_during_pending_change_keeps_local_value() {
    let gateway = FakeGateway::with_devices(vec![switch(MAC, vec![port(3, Some("off"))], vec![])]);
    let registry = RecordingRegistry::new();
    let (mut engine, entity) = tracked(&gateway, &registry, &spec(MAC, 3, PortMode::Auto)).await;
    assert!(!entity.is_on());

    entity.set(true);
    engine.tick().await.unwrap();
    assert!(entity.is_on(), "stale poll must not overwrite a pending toggle");

    entity.settle().await;
    engine.tick().await.unwrap();
    assert!(entity.is_on(), "controller now reports the written override");
}

// ── Auto writes ─────────────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn auto_write_edits_existing_override_and_keeps_others() {
    let mut camera = port_override(3, "off");
    camera.extra.insert("name".into(), serde_json::json!("Camera"));
    let gateway = FakeGateway::with_devices(vec![switch(
        MAC,
        vec![port(1, Some("auto")), port(3, Some("auto"))],
        vec![port_override(1, "pasv24"), camera],
    )]);
    let registry = RecordingRegistry::new();
    let mut cam_spec = spec(MAC, 3, PortMode::Auto);
    cam_spec.poe_on_mode = "pasv24".into();
    let (_engine, entity) = tracked(&gateway, &registry, &cam_spec).await;

    entity.set(true);
    entity.settle().await;

    let written = gateway.device("default", MAC).unwrap().port_overrides;
    assert_eq!(written.len(), 2);
    assert_eq!(written[0], port_override(1, "pasv24"));
    assert_eq!(written[1].poe_mode.as_deref(), Some("pasv24"));
    assert_eq!(written[1].extra.get("name"), Some(&serde_json::json!("Camera")));
}

#[tokio::test(start_paused = true)]
async fn failed_write_is_swallowed_and_entity_returns_to_idle() {
    let gateway = FakeGateway::with_devices(vec![switch(MAC, vec![port(3, Some("auto"))], vec![])]);
    let registry = RecordingRegistry::new();
    let (mut engine, entity) = tracked(&gateway, &registry, &spec(MAC, 3, PortMode::Auto)).await;
    gateway.fail_writes(true);

    entity.set(false);
    entity.settle().await;

    assert_eq!(gateway.writes().len(), 1);
    assert!(!entity.is_change_pending());

    engine.tick().await.unwrap();
    assert!(entity.is_on(), "next poll restores the controller's value");
}

#[tokio::test(start_paused = true)]
async fn write_for_vanished_device_sends_nothing() {
    let gateway = FakeGateway::with_devices(vec![switch(MAC, vec![port(3, Some("auto"))], vec![])]);
    let registry = RecordingRegistry::new();
    let (_engine, entity) = tracked(&gateway, &registry, &spec(MAC, 3, PortMode::Auto)).await;
    gateway.set_site_devices("default", vec![]);

    entity.set(false);
    entity.settle().await;

    assert!(gateway.writes().is_empty());
    let fetches = gateway
        .calls()
        .into_iter()
        .filter(|c| *c == Call::ListDevices("default".into()))
        .count();
    assert_eq!(fetches, 2, "the write re-fetches devices first");
    assert!(!entity.is_change_pending());
}

// ── Power-cycle writes ──────────────────────────────────────────────

#[tokio::test(start_paused = true)]
async fn power_cycle_on_unpowered_port_sends_nothing_and_reads_off() {
    let gateway = FakeGateway::with_devices(vec![switch(
        MAC,
        vec![port(3, Some("auto"))],
        vec![port_override(3, "off")],
    )]);
    let registry = RecordingRegistry::new();
    let (_engine, entity) = tracked(&gateway, &registry, &spec(MAC, 3, PortMode::PowerCycle)).await;

    entity.set(true);
    assert!(entity.is_on());
    entity.settle().await;

    assert!(gateway.writes().is_empty());
    assert!(!entity.is_on());
    assert_eq!(registry.notifications(), vec![(entity.handle(), false)]);
}

#[tokio::test(start_paused = true)]
async fn power_cycle_on_powered_port_sends_command_and_resets() {
    let gateway = FakeGateway::with_devices(vec![switch(MAC, vec![port(3, Some("auto"))], vec![])]);
    let registry = RecordingRegistry::new();
    let (_engine, entity) = tracked(&gateway, &registry, &spec(MAC, 3, PortMode::PowerCycle)).await;

    entity.set(true);
    entity.settle().await;

    assert_eq!(
        gateway.writes(),
        vec![Call::PowerCycle {
            site: "default".into(),
            mac: MacAddress::new(MAC),
            port_idx: 3,
        }]
    );
    assert!(!entity.is_on());
}

#[tokio::test(start_paused = true)]
async fn power_cycle_switched_back_off_sends_nothing() {
    let gateway = FakeGateway::with_devices(vec![switch(MAC, vec![port(3, Some("auto"))], vec![])]);
    let registry = RecordingRegistry::new();
    let (_engine, entity) = tracked(&gateway, &registry, &spec(MAC, 3, PortMode::PowerCycle)).await;

    entity.set(true);
    entity.set(false);
    entity.settle().await;

    assert!(gateway.writes().is_empty());
}
