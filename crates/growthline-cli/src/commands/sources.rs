use growthline_core::EngineConfig;
use serde::Serialize;

use crate::cli::SourcesArgs;
use crate::error::CliError;

use super::{build_router, load_snapshot, CommandResult};

#[derive(Debug, Serialize)]
struct SourceStatus {
    id: String,
    status: &'static str,
    endpoints: Vec<&'static str>,
    quota_limit: u32,
    quota_window_secs: f64,
    max_wait_secs: f64,
}

#[derive(Debug, Serialize)]
struct SourcesResponseData {
    sources: Vec<SourceStatus>,
}

pub fn run(args: &SourcesArgs, config: &EngineConfig) -> Result<CommandResult, CliError> {
    let snapshot = load_snapshot(&args.snapshot)?;
    let router = build_router(&snapshot, config);

    let sources = router
        .registered_sources()
        .into_iter()
        .filter_map(|provider| router.snapshot(provider))
        .map(|snapshot| SourceStatus {
            id: snapshot.id.to_string(),
            status: snapshot.status_label(),
            endpoints: snapshot.capabilities.supported_endpoints(),
            quota_limit: snapshot.quota_limit,
            quota_window_secs: snapshot.quota_window.as_secs_f64(),
            max_wait_secs: snapshot.max_wait.as_secs_f64(),
        })
        .collect();

    let data = serde_json::to_value(SourcesResponseData { sources })?;
    Ok(CommandResult::ok(data))
}
