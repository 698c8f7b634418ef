use anyhow::{anyhow, Context};
use clap::Parser;
use kasasagi::config::Config;
use kasasagi::constants::DEFAULT_CONFIG_FILE;
use kasasagi::pipeline::Pipeline;
use kasasagi::server::ImageServer;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

/// Kasasagi - on-demand image resizing with a content-addressed disk cache
#[derive(Parser, Debug)]
#[command(name = "kasasagi")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (built-in defaults when it does not exist)
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: PathBuf,

    /// Listen address, overrides server.bind
    #[arg(short, long)]
    bind: Option<String>,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config_found = args.config.is_file();
    let mut config = Config::load(&args.config)
        .map_err(|e| anyhow!("Failed to load configuration: {}", e))?;
    if let Some(bind) = args.bind {
        config.server.bind = bind;
    }
    config
        .validate()
        .map_err(|e| anyhow!("Invalid configuration: {}", e))?;

    if args.test {
        println!("Configuration OK");
        return Ok(());
    }

    kasasagi::logging::init_subscriber(&config.logging)
        .map_err(|e| anyhow!("Failed to initialize logging subsystem: {}", e))?;

    tracing::info!(
        config_file = %args.config.display(),
        config_found,
        bind = %config.server.bind,
        image_dir = %config.storage.image_dir.display(),
        cache_dir = %config.storage.cache_dir.display(),
        max_width = config.image.max_width,
        max_height = config.image.max_height,
        "Configuration loaded successfully"
    );

    if !config.storage.image_dir.is_dir() {
        tracing::warn!(
            image_dir = %config.storage.image_dir.display(),
            "Image directory does not exist, every request will be 404"
        );
    }

    let pipeline = Arc::new(Pipeline::from_config(&config));
    let server = Arc::new(ImageServer::new(pipeline, config.defaults));

    let addr = config.server.socket_addr().map_err(|e| anyhow!(e))?;
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    server.serve(listener, shutdown_signal()).await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
