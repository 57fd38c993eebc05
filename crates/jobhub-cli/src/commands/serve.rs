//! Start the JobHub server.

use clap::Args;

use jobhub_core::error::AppError;
use jobhub_worker::builtin_registry;

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Override the server port
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Override the server host
    #[arg(long)]
    pub host: Option<String>,

    /// Serve the API without the background worker
    #[arg(long)]
    pub no_worker: bool,
}

/// Execute the serve command
pub async fn execute(args: &ServeArgs, config_path: &str, env: &str) -> Result<(), AppError> {
    let mut config = super::load_config(config_path, env)?;

    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(ref host) = args.host {
        config.server.host = host.clone();
    }
    if args.no_worker {
        config.worker.enabled = false;
    }

    println!("Starting JobHub server...");
    println!("  Host: {}", config.server.host);
    println!("  Port: {}", config.server.port);
    println!("  Store: {}", config.database.backend);

    jobhub_api::run_server(config, builtin_registry()).await
}
