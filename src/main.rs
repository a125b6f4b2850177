use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use rotor::config::{load_config, ProxyConfig};
use rotor::HttpServer;

#[derive(Debug, Parser)]
#[command(name = "rotor", about = "Round-robin reverse-proxy load balancer")]
struct Args {
    /// Path to a TOML configuration file. Without it, built-in defaults
    /// apply (listen on :8080, three localhost backends).
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rotor=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => default_config(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        backends = config.backends.len(),
        health_interval_secs = config.health_check.interval_secs,
        "configuration loaded"
    );

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;
    server.run(listener).await?;

    Ok(())
}

fn default_config() -> ProxyConfig {
    ProxyConfig {
        backends: vec![
            "http://localhost:8081".to_string(),
            "http://localhost:8082".to_string(),
            "http://localhost:8083".to_string(),
        ],
        ..ProxyConfig::default()
    }
}
