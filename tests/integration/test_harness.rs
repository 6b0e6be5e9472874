// Test harness for integration tests
// Starts the HTTP server in-process on 127.0.0.1:0 with a temporary output directory

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use image_service::config::ServerConfig;
use image_service::orchestrator::{CanvasSize, Orchestrator};
use image_service::server::WatermarkServer;
use image_service::sink::PngFileSink;
use image_service::watermark::ImageTransformer;
use std::io::Cursor;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Running server that stops when dropped
pub struct ServerTestHarness {
    pub base_url: String,
    pub output: TempDir,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<std::io::Result<()>>>,
}

impl ServerTestHarness {
    /// Start a server composing onto a `canvas` sized canvas
    pub async fn start(canvas: CanvasSize) -> Self {
        Self::start_with(canvas, 1024 * 1024).await
    }

    pub async fn start_with(canvas: CanvasSize, max_body_size: usize) -> Self {
        let output = TempDir::new().expect("Failed to create output directory");

        let orchestrator = Orchestrator::new(
            Arc::new(ImageTransformer::new()),
            Arc::new(PngFileSink::new(output.path())),
            canvas,
            Duration::from_secs(10),
        );

        let server_config = ServerConfig {
            address: "127.0.0.1".to_string(),
            port: 0,
            max_body_size,
            ..ServerConfig::default()
        };

        let server = WatermarkServer::bind(&server_config, orchestrator)
            .await
            .expect("Failed to bind test server");
        let addr = server.local_addr().expect("Bound server has an address");

        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(server.run_until(async move {
            let _ = rx.await;
        }));

        Self {
            base_url: format!("http://{}", addr),
            output,
            shutdown: Some(tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Files currently present in the output directory
    pub fn output_files(&self) -> Vec<PathBuf> {
        std::fs::read_dir(self.output.path())
            .expect("Output directory readable")
            .map(|entry| entry.expect("Directory entry").path())
            .collect()
    }

    /// Stop accepting connections and wait for the listener to exit
    pub async fn stop(mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle
                .await
                .expect("Server task panicked")
                .expect("Server returned an error");
        }
    }
}

impl Drop for ServerTestHarness {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}

pub fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x % 255) as u8, (y % 255) as u8, 200])
    });
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgb8(img)
        .write_to(&mut buffer, ImageFormat::Jpeg)
        .expect("Failed to encode JPEG");
    buffer.into_inner()
}

pub fn png_bytes(width: u32, height: u32, color: Rgba<u8>) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, color);
    let mut buffer = Cursor::new(Vec::new());
    DynamicImage::ImageRgba8(img)
        .write_to(&mut buffer, ImageFormat::Png)
        .expect("Failed to encode PNG");
    buffer.into_inner()
}
