//! Output rendering for `unipoe list`.

use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

use unipoe_core::{EntityRegistry, Gateway, PortEntity};

use crate::cli::OutputFormat;
use crate::error::CliError;

#[derive(Debug, Serialize, Tabled)]
pub struct EntityRow {
    #[tabled(rename = "Name")]
    pub name: String,
    #[tabled(rename = "MAC")]
    pub mac: String,
    #[tabled(rename = "Port")]
    pub port: u32,
    #[tabled(rename = "Mode")]
    pub mode: String,
    #[tabled(rename = "State", display_with = "display_state")]
    pub on: bool,
    #[tabled(rename = "Site", display_with = "display_opt")]
    pub site: Option<String>,
    #[tabled(rename = "Device", display_with = "display_opt")]
    pub device_id: Option<String>,
    #[tabled(rename = "Handle")]
    pub handle: String,
}

impl EntityRow {
    pub fn from_entity<G: Gateway, R: EntityRegistry>(entity: &PortEntity<G, R>) -> Self {
        let key = entity.key();
        let placement = entity.placement();
        Self {
            name: entity.name(),
            mac: key.mac.to_string(),
            port: key.port_idx,
            mode: key.mode.to_string(),
            on: entity.is_on(),
            site: placement.as_ref().map(|p| p.site.clone()),
            device_id: placement.map(|p| p.device_id),
            handle: entity.handle().to_string(),
        }
    }
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn display_state(on: &bool) -> String {
    if *on { "on" } else { "off" }.to_owned()
}

#[allow(clippy::ref_option)]
fn display_opt(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| "-".into())
}

pub fn render_list(rows: &[EntityRow], format: OutputFormat) -> Result<String, CliError> {
    Ok(match format {
        OutputFormat::Table => Table::new(rows).with(Style::rounded()).to_string(),
        OutputFormat::Json => serde_json::to_string_pretty(rows)?,
    })
}
