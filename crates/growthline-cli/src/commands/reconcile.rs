use std::time::Duration;

use growthline_core::{
    Engine, EngineConfig, Entity, FiscalDate, RunOptions, RunReport, Snapshot, Symbol,
};
use tracing::info;

use crate::cli::ReconcileArgs;
use crate::error::CliError;
use crate::metadata::RunId;

use super::{build_router, load_snapshot, CommandResult};

pub async fn run(
    args: &ReconcileArgs,
    config: EngineConfig,
) -> Result<CommandResult, CliError> {
    let as_of = args.as_of.as_deref().map(FiscalDate::parse).transpose()?;
    let snapshot = load_snapshot(&args.snapshot)?;
    let universe = select_universe(&snapshot, &args.symbols)?;

    let router = build_router(&snapshot, &config);
    let engine = Engine::new(config, router);
    let options = RunOptions {
        as_of,
        deadline: args.deadline_secs.map(Duration::from_secs),
    };

    let run_id = RunId::new_v4();
    info!(%run_id, entities = universe.len(), "run starting");
    let outcome = engine.run_universe(universe, options).await;
    let report = RunReport::new(
        run_id.to_string(),
        outcome.entity_count,
        outcome.companies,
        outcome.abandoned,
    );
    info!(
        %run_id,
        successful = report.meta.successful_extractions,
        issues = report.issue_count(),
        abandoned = report.meta.abandoned.len(),
        "run finished"
    );

    Ok(CommandResult {
        issue_count: report.issue_count(),
        entity_failures: report.entity_failures(),
        abandoned: report.meta.abandoned.len(),
        data: serde_json::to_value(&report)?,
    })
}

/// The snapshot's universe, or the requested symbols in the order given.
/// Requested symbols absent from the universe run with no name or filer id.
fn select_universe(snapshot: &Snapshot, requested: &[String]) -> Result<Vec<Entity>, CliError> {
    if requested.is_empty() {
        return Ok(snapshot.universe.clone());
    }

    requested
        .iter()
        .map(|raw| -> Result<Entity, CliError> {
            let symbol = Symbol::parse(raw)?;
            Ok(snapshot
                .universe
                .iter()
                .find(|entity| entity.symbol == symbol)
                .cloned()
                .unwrap_or_else(|| Entity::new(symbol)))
        })
        .collect()
}
