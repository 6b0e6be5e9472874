use anyhow::Context;
use clap::Parser;
use image_service::config::Config;
use image_service::orchestrator::Orchestrator;
use image_service::server::WatermarkServer;
use image_service::sink::PngFileSink;
use image_service::watermark::ImageTransformer;
use std::path::PathBuf;
use std::sync::Arc;

/// Image Service - composes uploads onto a fixed canvas and tiles a watermark over them
#[derive(Parser, Debug)]
#[command(name = "image-service")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override server.port
    #[arg(short, long)]
    port: Option<u16>,

    /// Override output.directory
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Test configuration and exit
    #[arg(long)]
    test: bool,
}

impl Args {
    fn load_config(&self) -> anyhow::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_file(path)
                .map_err(anyhow::Error::msg)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => Config::default(),
        };

        if let Some(port) = self.port {
            config.server.port = port;
        }
        if let Some(dir) = &self.output_dir {
            config.output.directory = dir.clone();
        }

        config
            .validate()
            .map_err(anyhow::Error::msg)
            .context("Invalid configuration")?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging subsystem
    image_service::logging::init_subscriber()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging subsystem: {}", e))?;

    let args = Args::parse();
    let config = args.load_config()?;

    tracing::info!(
        config_file = ?args.config,
        server_address = %config.server.address,
        server_port = config.server.port,
        canvas_width = config.canvas.width,
        canvas_height = config.canvas.height,
        output_dir = %config.output.directory.display(),
        "Configuration loaded successfully"
    );

    if args.test {
        println!("Configuration OK");
        return Ok(());
    }

    let orchestrator = Orchestrator::new(
        Arc::new(ImageTransformer::new()),
        Arc::new(PngFileSink::new(config.output.directory.clone())),
        config.canvas.size(),
        config.server.request_timeout(),
    );

    let server = WatermarkServer::bind(&config.server, orchestrator)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.listen_address()))?;

    tracing::info!(
        address = %server.local_addr()?,
        "Starting image service"
    );

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    Ok(())
}
