//! # Cleanup Server - Entry Point
//! src/main.rs
//!
//! Parsea la configuración (CLI + entorno), inicializa los logs y arranca
//! el servidor.

use anyhow::{anyhow, Context, Result};
use cleanup_server::config::Config;
use cleanup_server::server::Server;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    let config = Config::new();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(config.log_level()));
    tracing_subscriber::fmt().with_env_filter(filter).with_thread_names(true).init();

    config.validate().map_err(|e| anyhow!("invalid configuration: {}", e))?;
    config.log_summary();

    let mut server = Server::new(config);
    let addr = server.bind().context("failed to bind listener")?;
    tracing::info!(%addr, "cleanup server listo");

    server.run().context("server stopped with an error")?;
    Ok(())
}
