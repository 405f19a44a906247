//! `amp-worker` -- run hosted-model generations from the command line.
//!
//! Each `generate` call is submitted to an in-process job queue, its
//! progress is logged, and the resulting URL or text is printed on
//! stdout. Exit code 0 means success, 1 means failure or bad usage.
//!
//! # Environment variables
//!
//! | Variable                   | Required | Default | Description                     |
//! |----------------------------|----------|---------|---------------------------------|
//! | `REPLICATE_API_TOKEN`      | yes      | --      | Inference API token             |
//! | `REPLICATE_API_BASE_URL`   | no       | public  | Inference API base URL          |
//! | `JOB_QUEUE_MAX_CONCURRENT` | no       | `10`    | Concurrently running jobs       |
//! | `AMP_OUTPUT_DIR`           | no       | tmp dir | Where byte outputs are written  |
//! | `RUST_LOG`                 | no       | info    | Log filter                      |
//!
//! See `ReplicateConfig::from_env` for the polling and retry knobs.

use std::process::ExitCode;
use std::sync::Arc;

use amp_jobs::{JobQueue, QueueConfig};
use amp_replicate::{ReplicateClient, ReplicateConfig};
use amp_worker::cli::{Cli, Command};
use amp_worker::generation::run_in_queue;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "amp_worker=info,amp_replicate=info,amp_jobs=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %format!("{e:#}"), "Command failed");
            eprintln!("{e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let client = Arc::new(ReplicateClient::new(ReplicateConfig::from_env())?);

    match cli.command {
        Command::Generate(args) => {
            let queue = JobQueue::start(QueueConfig::from_env());

            let interrupt = CancellationToken::new();
            let on_signal = interrupt.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    on_signal.cancel();
                }
            });

            let output = run_in_queue(client, &queue, args.into_request(), interrupt).await;
            queue.shutdown().await;
            println!("{}", output?.as_str());
        }
        Command::Resolve { reference } => {
            let version = client.resolve_version(&reference).await?;
            println!("{version}");
        }
    }
    Ok(())
}
