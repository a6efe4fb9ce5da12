mod cli;
mod commands;
mod store;
mod unload;

use taskdeck_config::TaskdeckConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let args = cli::parse();

    // Load config before logging so its level can seed the filter
    let loaded = taskdeck_config::load_config(args.config.as_deref());

    // Initialize logging
    let log_directive = args.log_level.clone().unwrap_or_else(|| match &loaded {
        Ok(config) => config.logging.level.directive(),
        Err(_) => "taskdeck=info".into(),
    });
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log_directive)),
        )
        .init();

    tracing::debug!("taskdeck v{} starting", env!("CARGO_PKG_VERSION"));

    if let Some(ref path) = args.config {
        tracing::info!("Using config override: {}", path.display());
    }
    let config = loaded.unwrap_or_else(|e| {
        tracing::warn!("Config load failed, using defaults: {e}");
        TaskdeckConfig::default()
    });

    if let Err(e) = commands::run(args.command, config).await {
        tracing::error!("{e}");
        std::process::exit(1);
    }
}
