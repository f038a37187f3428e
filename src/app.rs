//! Per-invocation context shared by CLI commands.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use crate::cli::Cli;
use crate::config::Config;
use crate::core::{ActorId, SystemClock};
use crate::error::Result;
use crate::lifecycle::MappingLifecycleService;
use crate::storage::Database;

pub struct AppContext {
    pub tsm_root: PathBuf,
    pub config: Config,
    pub db: Arc<Database>,
    pub service: MappingLifecycleService,
    /// Actor stamped on every write of this invocation.
    pub actor: ActorId,
    pub json: bool,
    /// Skip human-readable output; errors and JSON envelopes still print.
    pub quiet: bool,
}

impl std::fmt::Debug for AppContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppContext")
            .field("tsm_root", &self.tsm_root)
            .field("actor", &self.actor)
            .field("json", &self.json)
            .field("quiet", &self.quiet)
            .finish_non_exhaustive()
    }
}

impl AppContext {
    pub fn from_cli(cli: &Cli, config: Config) -> Result<Self> {
        let actor = cli.actor.map_or_else(|| config.system_actor(), ActorId);
        let mut ctx = Self::open(cli.tsm_root(), config, actor, cli.json)?;
        ctx.quiet = cli.quiet;
        Ok(ctx)
    }

    pub fn open(tsm_root: PathBuf, config: Config, actor: ActorId, json: bool) -> Result<Self> {
        let db_path = config.database_path(&tsm_root);
        debug!(root = %tsm_root.display(), db = %db_path.display(), %actor, "opening context");
        let db = Arc::new(Database::open_with_timeout(&db_path, config.busy_timeout())?);
        let service = MappingLifecycleService::new(db.clone(), Arc::new(SystemClock));
        Ok(Self {
            tsm_root,
            config,
            db,
            service,
            actor,
            json,
            quiet: false,
        })
    }
}
