// Command-line client for the watermark endpoint
//
// Sends an image and a watermark as a multipart request and prints the
// status, headers and body of the response.

use anyhow::Context;
use clap::Parser;
use reqwest::multipart::{Form, Part};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use image_service::constants::{IMAGE_PART, WATERMARK_PART};

#[derive(Parser, Debug)]
#[command(name = "watermark-client")]
#[command(version, about = "Submit an image and a watermark to the image service", long_about = None)]
struct Args {
    /// Background image (JPEG)
    image: PathBuf,

    /// Watermark image (PNG)
    watermark: PathBuf,

    /// Endpoint to post to
    #[arg(long, default_value = "http://localhost:3210/watermark")]
    url: String,
}

async fn file_part(path: &Path) -> anyhow::Result<Part> {
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(Part::bytes(data).file_name(file_name))
}

async fn submit(args: &Args) -> anyhow::Result<()> {
    println!(
        "Used image: {}, watermark: {}",
        args.image.display(),
        args.watermark.display()
    );

    let form = Form::new()
        .part(
            IMAGE_PART,
            file_part(&args.image)
                .await
                .context("Failed create part for image")?,
        )
        .part(
            WATERMARK_PART,
            file_part(&args.watermark)
                .await
                .context("Failed create part for watermark")?,
        );

    let response = reqwest::Client::new()
        .post(&args.url)
        .multipart(form)
        .send()
        .await
        .context("Failed send request")?;

    println!("{}", response.status().as_u16());
    println!("{:?}", response.headers());
    let body = response.text().await.context("Failed read response body")?;
    println!("{}", body);

    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = match Args::try_parse() {
        Ok(args) => args,
        Err(e) => {
            // --help and --version land here too
            let _ = e.print();
            return if e.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };

    match submit(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
