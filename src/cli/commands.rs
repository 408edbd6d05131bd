//! Subcommand implementations

use anyhow::{anyhow, bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::app::{init_logging, start_pipeline, AppConfig};
use crate::client::{HttpClient, JobClient, PollOutcome, Poller};
use crate::error::Error;
use crate::job::{run_pipeline, JobId};
use crate::server;

use super::args::{Cli, Commands};

/// Load configuration, set up logging and run the selected subcommand
pub async fn execute(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())
        .context("Failed to load configuration")?
        .with_verbose(cli.verbose);
    init_logging(&config);

    match cli.command {
        Commands::Serve { bind } => run_serve(config, bind).await,
        Commands::Submit {
            file,
            server,
            output,
        } => run_submit(&config, &file, server, output).await,
        Commands::Aggregate { file, output } => run_aggregate(&file, output).await,
        Commands::Status { job_id, server } => run_status(&job_id, &server).await,
    }
}

async fn run_serve(mut config: AppConfig, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }

    let pipeline = start_pipeline(&config)
        .await
        .context("Failed to start job pipeline")?;
    let state = pipeline.app_state(config.server.public_url.clone());

    let served = server::serve(&config.server, state, shutdown_signal()).await;
    pipeline.shutdown().await;
    served.with_context(|| format!("API server on {} failed", config.server.bind))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested");
}

async fn run_submit(
    config: &AppConfig,
    file: &Path,
    server: Option<String>,
    output: Option<PathBuf>,
) -> Result<()> {
    let csv_data = read_csv(file).await?;

    let outcome = match server {
        Some(url) => {
            let poller = Poller::new(HttpClient::new(url), config.poller.clone());
            poller.run(&csv_data).await
        }
        None => {
            let pipeline = start_pipeline(config)
                .await
                .context("Failed to start job pipeline")?;
            let outcome = pipeline.local_poller(config).run(&csv_data).await;
            pipeline.shutdown().await;
            outcome
        }
    }
    .with_context(|| format!("Failed to submit {}", file.display()))?;

    match outcome {
        PollOutcome::Completed { job_id, download } => {
            info!("Job {} completed ({})", job_id, download.filename);
            write_output(output.as_deref(), &download.content).await
        }
        PollOutcome::Failed { job_id, message } => {
            bail!("Job {job_id} failed: {message}")
        }
        PollOutcome::TimedOut { job_id, attempts } => Err(anyhow!(
            "Job {job_id} did not finish after {attempts} status checks"
        )),
    }
}

async fn run_aggregate(file: &Path, output: Option<PathBuf>) -> Result<()> {
    let csv_data = read_csv(file).await?;
    let result = run_pipeline(&csv_data)
        .map_err(Error::from)
        .with_context(|| format!("Failed to aggregate {}", file.display()))?;

    info!(
        "Aggregated {} rows into {} departments ({} skipped)",
        result.row_count,
        result.totals.len(),
        result.skipped
    );
    write_output(output.as_deref(), &result.csv_content).await
}

async fn run_status(job_id: &str, server: &str) -> Result<()> {
    let client = HttpClient::new(server);
    let report = client
        .status(&JobId::from(job_id))
        .await
        .with_context(|| format!("Failed to fetch status of {job_id}"))?;

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn read_csv(file: &Path) -> Result<String> {
    tokio::fs::read_to_string(file)
        .await
        .map_err(Error::from)
        .with_context(|| format!("Failed to read {}", file.display()))
}

async fn write_output(output: Option<&Path>, content: &str) -> Result<()> {
    match output {
        Some(path) => {
            tokio::fs::write(path, content)
                .await
                .with_context(|| format!("Failed to write {}", path.display()))?;
            info!("Wrote results to {}", path.display());
        }
        None => print!("{content}"),
    }
    Ok(())
}
