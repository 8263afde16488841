//! Command handlers.
//!
//! Every command loads the config, opens the state file, logs in, and
//! builds a [`Reconciler`] reattached to the entities from the last run.

pub mod list;
pub mod run;
pub mod set;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use unipoe_api::SessionClient;
use unipoe_core::{EntityRegistry, Reconciler};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::registry::FileRegistry;

pub type Engine = Reconciler<SessionClient, FileRegistry>;

/// A logged-in client plus the engine driving it.
pub struct Context {
    pub client: Arc<SessionClient>,
    pub engine: Engine,
    pub refresh_interval: Duration,
}

impl Context {
    pub async fn connect(global: &GlobalOpts) -> Result<Self, CliError> {
        let config = unipoe_config::load_config(global.config.as_deref())?;
        let platform = config.to_platform_config()?;

        let client = Arc::new(platform.session_client()?);
        let registry = Arc::new(FileRegistry::open(config.state_path())?);

        let mut engine = Reconciler::new(
            Arc::clone(&client),
            Arc::clone(&registry),
            platform.ports,
            platform.debounce,
        );
        let restored = engine.restore(registry.cached_entities());
        debug!(
            restored,
            state_file = %registry.path().display(),
            "reattached cached entities"
        );

        client.authenticate().await?;
        info!(controller = %platform.controller, "logged in");

        Ok(Self {
            client,
            engine,
            refresh_interval: platform.refresh_interval,
        })
    }

    /// Flush pending writes and end the controller session.
    pub async fn close(self) {
        self.engine.settle().await;
        if let Err(err) = self.client.logout().await {
            warn!(error = %err, "logout failed");
        }
    }
}

pub async fn dispatch(command: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let ctx = Context::connect(global).await?;
    debug!(command = ?command, "dispatching command");
    match command {
        Command::Run => run::handle(ctx).await,
        Command::List(args) => list::handle(ctx, &args).await,
        Command::Set(args) => set::handle(ctx, &args).await,
    }
}
