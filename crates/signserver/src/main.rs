use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use eyre::{Result, WrapErr};
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

use signserver::bootstrap::WorkersFile;
use signserver::{AppState, SeedKeyProvider, WorkerRegistry, run};

#[derive(Parser)]
struct Args {
    #[clap(long, env = "SIGNSERVER_HOST", default_value = "127.0.0.1")]
    host: String,
    #[clap(long, env = "SIGNSERVER_PORT", default_value = "3000")]
    port: u16,
    /// JSON file of workers to provision at startup.
    #[clap(long, env = "SIGNSERVER_WORKERS_FILE")]
    workers_file: Option<PathBuf>,
    #[clap(long, env = "SIGNSERVER_LOG_LEVEL", default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(args.log_level)
        .with_target(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .wrap_err("setting tracing subscriber")?;

    let registry = Arc::new(WorkerRegistry::new(Arc::new(SeedKeyProvider)));
    if let Some(path) = &args.workers_file {
        WorkersFile::load(path)?.apply(&registry)?;
    }
    info!(workers = registry.list().len(), "Worker registry ready");

    run(&args.host, args.port, AppState::new(registry))
        .await
        .map_err(|e| eyre::eyre!("{e:#}"))
}
