//! taskdeck-server: shared document store for live task presence.

use std::path::PathBuf;

use clap::Parser;
use taskdeck_config::TaskdeckConfig;
use taskdeck_server::{serve, ServerOptions, ServerState};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "taskdeck-server", version, about = "Shared document store for taskdeck presence")]
struct Args {
    /// Port to listen on (overrides config).
    #[arg(short, long)]
    port: Option<u16>,

    /// Address to bind (overrides config).
    #[arg(long)]
    bind: Option<String>,

    /// Delete a connection's viewer records when it disconnects.
    #[arg(long)]
    reap_on_disconnect: bool,

    /// Path to a config file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Log filter directive (e.g. "taskdeck=debug").
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let loaded = taskdeck_config::load_config(args.config.as_deref());
    let directive = args.log_level.clone().unwrap_or_else(|| match &loaded {
        Ok(config) => config.logging.level.directive(),
        Err(_) => "taskdeck=info".into(),
    });
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&directive)),
        )
        .init();

    let mut config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        TaskdeckConfig::default()
    });
    if let Some(port) = args.port {
        config.server.port = port;
    }
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    if args.reap_on_disconnect {
        config.server.reap_on_disconnect = true;
    }

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(addr = %addr, error = %e, "Failed to bind TCP listener");
            std::process::exit(1);
        }
    };

    let options = ServerOptions::from(&config.server);
    tracing::info!(
        reap_on_disconnect = options.reap_on_disconnect,
        "taskdeck-server v{} listening on {}",
        env!("CARGO_PKG_VERSION"),
        addr
    );

    let shutdown = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    serve(listener, ServerState::new(options), shutdown).await;
}
