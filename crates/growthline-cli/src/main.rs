mod cli;
mod commands;
mod error;
mod logging;
mod metadata;
mod output;

use clap::Parser;
use std::process::ExitCode;

use crate::cli::Cli;
use crate::error::CliError;

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::from(error.exit_code())
        }
    }
}

async fn run() -> Result<ExitCode, CliError> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let result = commands::run(&cli).await?;
    output::render(&result.data, cli.pretty)?;

    if cli.strict && (result.issue_count > 0 || result.abandoned > 0) {
        return Err(CliError::StrictModeViolation {
            issue_count: result.issue_count,
            abandoned: result.abandoned,
        });
    }

    if result.entity_failures > 0 {
        return Ok(ExitCode::from(3));
    }

    Ok(ExitCode::SUCCESS)
}
