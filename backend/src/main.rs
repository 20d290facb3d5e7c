//! Service entry-point: reads configuration and runs the HTTP server.

use std::net::SocketAddr;

use actix_web::web;
use clap::Parser;
use mockable::DefaultEnv;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use after_payments::inbound::http::health::HealthState;
use after_payments::inbound::http::session_config::BuildMode;
use after_payments::server::{ServerConfig, create_server};

/// Command-line overrides; everything else comes from the environment.
#[derive(Debug, Parser)]
#[command(name = "after-payments", about = "After-payment fulfilment service")]
struct Cli {
    /// Address to listen on, overriding `BIND_ADDR`.
    #[arg(long)]
    bind_addr: Option<SocketAddr>,
}

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
    let config = ServerConfig::from_env(
        &DefaultEnv::new(),
        BuildMode::from_debug_assertions(),
        cli.bind_addr,
    )?;
    info!(bind_addr = %config.bind_addr(), "starting after-payments service");

    let server = create_server(web::Data::new(HealthState::new()), config)?;
    server.await?;
    Ok(())
}
