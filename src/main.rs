//! Caching proxy entry point.

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use caching_proxy::config::{load_config, validate_config, ConfigError, ProxyConfig};
use caching_proxy::lifecycle::{signals, Shutdown};
use caching_proxy::observability::{logging, metrics};
use caching_proxy::ProxyServer;

#[derive(Parser)]
#[command(name = "caching-proxy")]
#[command(about = "HTTP/1.0 forward proxy that caches origin responses on disk", long_about = None)]
struct Cli {
    /// IP address of the proxy server
    server_ip: IpAddr,

    /// Port to listen on [default: port from config, 8000]
    #[arg(short, long)]
    port: Option<u16>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for cached responses
    #[arg(long)]
    cache_dir: Option<PathBuf>,
}

impl Cli {
    fn into_config(self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => load_config(path)?,
            None => ProxyConfig::default(),
        };

        let port = match self.port {
            Some(port) => port,
            None => config
                .listener
                .bind_address
                .parse::<SocketAddr>()
                .map(|addr| addr.port())
                .unwrap_or(8000),
        };
        config.listener.bind_address = SocketAddr::new(self.server_ip, port).to_string();

        if let Some(dir) = self.cache_dir {
            config.cache.directory = dir.to_string_lossy().into_owned();
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Cli::parse().into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("caching-proxy: {e}");
            return ExitCode::from(2);
        }
    };

    logging::init_logging(&config.observability.log_level);
    tracing::info!("caching-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        cache_dir = %config.cache.directory,
        connect_timeout_secs = config.timeouts.connect_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = match ProxyServer::bind(&config).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!(error = %e, "Startup failed");
            return ExitCode::FAILURE;
        }
    };

    let shutdown = Shutdown::new();
    let stop = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    if let Err(e) = server.run(stop).await {
        tracing::error!(error = %e, "Proxy server failed");
        return ExitCode::FAILURE;
    }

    tracing::info!("Shutdown complete");
    ExitCode::SUCCESS
}
