//! `unipoe set`: toggle one entity and wait for its write.

use tracing::info;

use unipoe_core::PortMode;

use crate::cli::SetArgs;
use crate::commands::Context;
use crate::error::CliError;

pub async fn handle(mut ctx: Context, args: &SetArgs) -> Result<(), CliError> {
    let key = args.key();
    if !key.mac.is_well_formed() {
        return Err(CliError::Validation {
            field: "mac".into(),
            reason: format!("malformed MAC '{}'", args.mac),
        });
    }
    if !ctx.engine.specs().iter().any(|s| s.key() == key) {
        return Err(CliError::NotConfigured { serial: key.serial() });
    }

    ctx.engine.tick().await?;
    let Some(entity) = ctx.engine.entity_by_key(&key) else {
        return Err(CliError::NotFound { serial: key.serial() });
    };

    entity.set(args.on());
    entity.settle().await;

    match (key.mode, args.on()) {
        (PortMode::PowerCycle, true) => {
            info!(key = %key, "power-cycle requested");
            println!("{}: power-cycle requested", entity.name());
        }
        (PortMode::PowerCycle, false) => println!("{}: nothing to do", entity.name()),
        (PortMode::Auto, on) => {
            println!("{}: {}", entity.name(), if on { "on" } else { "off" });
        }
    }

    ctx.close().await;
    Ok(())
}
