//! Operator CLI: seeds the search engine, verifies a transfer, and probes
//! adapter processes.

mod config;
mod output;

use std::error::Error;
use std::process::ExitCode;
use std::sync::Arc;

use datashift_core::control::{SearchControlPlane, SqlControlPlane};
use datashift_core::store::{ElasticsearchClient, PgExecutor};
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{CliConfig, Task};

/// Exit status when verification completes without a match.
const VERIFY_MISMATCH_EXIT: u8 = 2;

type CliError = Box<dyn Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<ExitCode, CliError> {
    init_tracing();
    let config = CliConfig::from_args()?;

    match config.task {
        Task::Load {
            elasticsearch,
            request,
        } => {
            let control = SearchControlPlane::new(Arc::new(ElasticsearchClient::new(&elasticsearch)?));
            let report = datashift_ingest::load_file(&control, &request).await?;
            emit(config.json, &report, output::render_load)?;
            Ok(ExitCode::SUCCESS)
        }
        Task::Verify {
            elasticsearch,
            postgres,
            options,
        } => {
            let search = SearchControlPlane::new(Arc::new(ElasticsearchClient::new(&elasticsearch)?));
            let sql = SqlControlPlane::new(Arc::new(PgExecutor::connect_lazy(&postgres)?));
            let report = datashift_ingest::verify(&search, &sql, &options).await;
            emit(config.json, &report, output::render_verification)?;
            if report.verdict.is_match() {
                Ok(ExitCode::SUCCESS)
            } else {
                warn!(verdict = ?report.verdict, "stores do not match");
                Ok(ExitCode::from(VERIFY_MISMATCH_EXIT))
            }
        }
        Task::Probe { program, args } => {
            let report = datashift_ingest::probe_command(&program, &args).await?;
            emit(config.json, &report, output::render_probe)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn emit<T: Serialize>(json: bool, report: &T, render: fn(&T) -> String) -> Result<(), CliError> {
    let text = if json {
        serde_json::to_string_pretty(report)?
    } else {
        render(report)
    };
    println!("{text}");
    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(false),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
}
