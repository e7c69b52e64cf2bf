//! bobyak-proxy
//!
//! Same-origin relay between the browser client and the bobyak backend.
//!
//! # Architecture Overview
//!
//! ```text
//!                     ┌──────────────────────────────────────────────┐
//!                     │                 BOBYAK-PROXY                  │
//!   Client Request    │  ┌─────────┐   ┌──────────┐   ┌───────────┐  │
//!   ──────────────────┼─▶│  axum   │──▶│ request  │──▶│ upstream  │──┼──▶ Backend
//!   /api/proxy/...    │  │ server  │   │ target + │   │  client   │  │    origin
//!                     │  └─────────┘   │ headers  │   └─────┬─────┘  │
//!                     │                └──────────┘         │ 3xx?   │
//!                     │                               ┌─────▼─────┐  │
//!                     │                               │ redirect  │  │
//!                     │                               │  replay   │  │
//!   Client Response   │  ┌──────────┐                 └─────┬─────┘  │
//!   ◀─────────────────┼──│ response │◀──────────────────────┘        │
//!                     │  │  relay   │                                │
//!                     │  └──────────┘                                │
//!                     └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use bobyak_proxy::config::{self, ProxyConfig};
use bobyak_proxy::lifecycle::{signals, Shutdown};
use bobyak_proxy::observability::{logging, metrics};
use bobyak_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "bobyak-proxy")]
#[command(about = "Same-origin forwarding proxy for the bobyak backend", long_about = None)]
struct Args {
    /// TOML configuration file. Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override `upstream.base_url`.
    #[arg(short, long)]
    upstream: Option<String>,
}

fn load(args: &Args) -> Result<ProxyConfig, config::ConfigError> {
    config::load_with_overrides(args.config.as_deref(), |config| {
        if let Some(bind) = &args.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(upstream) = &args.upstream {
            config.upstream.base_url = upstream.clone();
        }
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load(&args)?;

    logging::init_logging(&config.observability);

    tracing::info!("bobyak-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        mount_prefix = %config.upstream.mount_prefix,
        max_redirects = config.upstream.max_redirects,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        // validated above
        let addr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    let server = HttpServer::new(config)?;
    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
