//! fairseed API Server Binary
//!
//! Serves sessions, games and verification over HTTP.

use clap::Parser;
use fairseed::api::ApiServer;
use fairseed::config::ConfigLoader;
use fairseed::init_tracing;

#[derive(Parser, Debug)]
#[command(name = "fairseed-api")]
#[command(about = "Provably fair game server", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(long)]
    config: Option<String>,

    /// API server host (overrides configuration)
    #[arg(long)]
    host: Option<String>,

    /// API server port (overrides configuration)
    #[arg(long)]
    port: Option<u16>,

    /// Allowed CORS origins (comma-separated, use * for all)
    #[arg(long)]
    cors_origins: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut loader = ConfigLoader::new();
    if let Some(path) = &args.config {
        loader = loader.with_path(path);
    }
    let mut config = loader.load()?;

    if let Some(host) = args.host {
        config.api.host = host;
    }
    if let Some(port) = args.port {
        config.api.port = port;
    }
    if let Some(origins) = args.cors_origins {
        config.api.allowed_origins = origins
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
    }
    config.validate()?;

    init_tracing(&config.logging);

    ApiServer::new(config).run().await
}
