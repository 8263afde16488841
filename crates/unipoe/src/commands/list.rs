//! `unipoe list`: one reconciliation pass, then print what is tracked.

use tracing::info;

use crate::cli::ListArgs;
use crate::commands::Context;
use crate::error::CliError;
use crate::output::{EntityRow, render_list};

pub async fn handle(mut ctx: Context, args: &ListArgs) -> Result<(), CliError> {
    let report = ctx.engine.tick().await?;
    info!(?report, "reconciled");

    let mut entities: Vec<_> = ctx.engine.entities().collect();
    entities.sort_by(|a, b| a.key().cmp(b.key()));
    let rows: Vec<EntityRow> = entities
        .into_iter()
        .map(|e| EntityRow::from_entity(e.as_ref()))
        .collect();

    println!("{}", render_list(&rows, args.output)?);
    ctx.close().await;
    Ok(())
}
