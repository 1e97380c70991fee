//! Backend entry-point: configuration, logging, and server startup.

use std::env;
use std::net::SocketAddr;
use std::time::Duration;

use actix_web::web;
use clap::Parser;
use tracing::warn;
use tracing_subscriber::{EnvFilter, fmt};

use backend::inbound::http::health::HealthState;
use backend::server::{ServerConfig, create_server};

/// Command-line options; every backend URL also falls back to the
/// conventional environment variable.
#[derive(Debug, Parser)]
#[command(name = "backend", about = "Matching and realtime notification backend")]
struct Cli {
    /// Socket address to bind.
    #[arg(long, default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// PostgreSQL URL; in-memory adapters are used when absent.
    #[arg(long)]
    database_url: Option<String>,

    /// Redis URL for the candidate cache; in-process cache when absent.
    #[arg(long)]
    redis_url: Option<String>,

    /// Seconds between grouping sweeps.
    #[arg(long, default_value_t = 300)]
    grouping_interval_secs: u64,

    /// Seconds between full candidate-cache refreshes.
    #[arg(long, default_value_t = 3600)]
    cache_refresh_interval_secs: u64,

    /// Seconds between inactivity sweeps.
    #[arg(long, default_value_t = 86400)]
    deactivation_interval_secs: u64,
}

/// Application bootstrap.
#[actix_web::main]
async fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let cli = Cli::parse();
    let database_url = cli
        .database_url
        .or_else(|| env::var("DATABASE_URL").ok());
    let redis_url = cli.redis_url.or_else(|| env::var("REDIS_URL").ok());

    let mut config = ServerConfig::new(cli.bind)
        .with_grouping_interval(Duration::from_secs(cli.grouping_interval_secs))
        .with_cache_refresh_interval(Duration::from_secs(cli.cache_refresh_interval_secs))
        .with_deactivation_interval(Duration::from_secs(cli.deactivation_interval_secs));
    if let Some(url) = database_url {
        config = config.with_database_url(url);
    } else {
        warn!("no database configured; serving from in-memory adapters");
    }
    if let Some(url) = redis_url {
        config = config.with_redis_url(url);
    }

    let health_state = web::Data::new(HealthState::new());
    let server = create_server(health_state, config).await?;
    server.await?;
    Ok(())
}
