mod reconcile;
mod sources;

use std::path::Path;
use std::sync::Arc;

use growthline_core::{EngineConfig, Snapshot, SourceRouter};
use serde_json::Value;
use tracing::debug;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub struct CommandResult {
    pub data: Value,
    pub issue_count: usize,
    pub entity_failures: usize,
    pub abandoned: usize,
}

impl CommandResult {
    pub fn ok(data: Value) -> Self {
        Self {
            data,
            issue_count: 0,
            entity_failures: 0,
            abandoned: 0,
        }
    }
}

pub async fn run(cli: &Cli) -> Result<CommandResult, CliError> {
    let config = load_config(cli.config.as_deref())?;

    match &cli.command {
        Command::Reconcile(args) => reconcile::run(args, config).await,
        Command::Sources(args) => sources::run(args, &config),
    }
}

fn load_config(path: Option<&Path>) -> Result<EngineConfig, CliError> {
    let config = match path {
        Some(path) => EngineConfig::from_path(path)?,
        None => EngineConfig::default(),
    };
    debug!(
        years = config.years_to_fetch,
        quarters = config.quarters_to_fetch,
        "configuration loaded"
    );
    Ok(config)
}

fn load_snapshot(path: &Path) -> Result<Arc<Snapshot>, CliError> {
    let contents = std::fs::read_to_string(path)?;
    let snapshot = Snapshot::from_json(&contents).map_err(|source| CliError::Snapshot {
        path: path.display().to_string(),
        source,
    })?;
    debug!(
        entities = snapshot.universe.len(),
        providers = snapshot.providers.len(),
        "snapshot loaded"
    );
    Ok(Arc::new(snapshot))
}

fn build_router(snapshot: &Arc<Snapshot>, config: &EngineConfig) -> SourceRouter {
    SourceRouter::with_policies(Snapshot::sources(snapshot), config.provider_policies())
}
