use anyhow::Result;
use clap::Parser;
use log::{error, info, warn};
use stadium_monitor::db::repositories::SessionsRepository;
use stadium_monitor::db::DatabaseService;
use stadium_monitor::{config, AppState, RestApi};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

const SESSION_PURGE_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Stadium monitoring dashboard backend
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// Configuration file (.toml or .json)
    #[arg(short, long, env = "STADIUM_CONFIG")]
    config: Option<PathBuf>,
}

async fn run_app(args: Args) -> Result<()> {
    let config = config::load_config(args.config.as_deref())?;

    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&config.api.log_level))
        .init();
    info!("Starting stadium monitor backend");

    if config.security.uses_default_secret() {
        warn!("Using the built-in JWT secret; set security.jwt_secret or JWT_SECRET");
    }

    if config.frigate_instances.is_empty() {
        warn!("No Frigate instances configured; semantic search will be unavailable");
    }

    let database = DatabaseService::new(&config.database).await?;
    let db_pool = Arc::clone(&database.pool);

    // Expired sessions are rejected on use; this only keeps the table small
    let sessions = SessionsRepository::new(Arc::clone(&db_pool));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SESSION_PURGE_INTERVAL);
        loop {
            interval.tick().await;
            if let Err(e) = sessions.purge_expired().await {
                error!("Failed to purge expired sessions: {}", e);
            }
        }
    });

    let state = AppState::new(db_pool, config)?;
    let http_server = RestApi::new(state);

    tokio::select! {
        result = http_server.run() => {
            if let Err(e) = &result {
                error!("API server stopped: {}", e);
            }
            result?;
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down...");
        }
    }

    database.pool.close().await;

    Ok(())
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    if let Err(e) = run_app(args).await {
        eprintln!("Application error: {:#}", e);
        std::process::exit(1);
    }
}
