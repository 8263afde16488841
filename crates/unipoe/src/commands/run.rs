//! `unipoe run`: the long-running poll loop.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::commands::Context;
use crate::error::CliError;

pub async fn handle(mut ctx: Context) -> Result<(), CliError> {
    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("interrupt received, shutting down"),
            Err(err) => warn!(error = %err, "cannot listen for interrupts"),
        }
        shutdown.cancel();
    });

    info!(
        interval_ms = ctx.refresh_interval.as_millis(),
        ports = ctx.engine.tracked_count(),
        "starting poll loop"
    );
    ctx.engine.run(ctx.refresh_interval, cancel).await;

    ctx.close().await;
    Ok(())
}
