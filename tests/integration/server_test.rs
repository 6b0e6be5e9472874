// HTTP round-trip tests for the watermark endpoint

use super::test_harness::{jpeg_bytes, png_bytes, ServerTestHarness};
use image::{GenericImageView, Rgba};
use image_service::orchestrator::CanvasSize;
use reqwest::multipart::{Form, Part};
use reqwest::StatusCode;

fn upload(image: Vec<u8>, watermark: Vec<u8>) -> Form {
    Form::new()
        .part("image", Part::bytes(image).file_name("photo.jpg"))
        .part("watermark", Part::bytes(watermark).file_name("mark.png"))
}

#[tokio::test]
async fn test_watermark_upload_stores_png() {
    let harness = ServerTestHarness::start(CanvasSize::new(160, 120)).await;

    let response = reqwest::Client::new()
        .post(harness.url("/watermark"))
        .multipart(upload(
            jpeg_bytes(320, 240),
            png_bytes(32, 32, Rgba([255, 255, 255, 100])),
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "text/plain; charset=utf-8"
    );

    let body = response.text().await.unwrap();
    let path = body
        .strip_prefix("Success. File saved as ")
        .expect("success message");

    let files = harness.output_files();
    assert_eq!(files.len(), 1);
    assert_eq!(files[0].to_str(), Some(path));
    assert_eq!(files[0].extension().and_then(|e| e.to_str()), Some("png"));

    let stored = image::open(&files[0]).unwrap();
    assert_eq!(stored.dimensions(), (160, 120));

    harness.stop().await;
}

#[tokio::test]
async fn test_malformed_watermark_is_rejected_without_output() {
    let harness = ServerTestHarness::start(CanvasSize::new(64, 48)).await;

    let response = reqwest::Client::new()
        .post(harness.url("/watermark"))
        .multipart(upload(jpeg_bytes(64, 48), b"not a png at all".to_vec()))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response.text().await.unwrap();
    assert!(body.contains("watermark"), "body: {}", body);
    assert!(harness.output_files().is_empty());
}

#[tokio::test]
async fn test_png_in_image_part_is_rejected() {
    let harness = ServerTestHarness::start(CanvasSize::new(64, 48)).await;
    let png = png_bytes(8, 8, Rgba([0, 0, 0, 255]));

    let response = reqwest::Client::new()
        .post(harness.url("/watermark"))
        .multipart(upload(png.clone(), png))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.text().await.unwrap().contains("'image'"));
}

#[tokio::test]
async fn test_missing_watermark_part() {
    let harness = ServerTestHarness::start(CanvasSize::new(64, 48)).await;
    let form = Form::new().part("image", Part::bytes(jpeg_bytes(16, 16)).file_name("a.jpg"));

    let response = reqwest::Client::new()
        .post(harness.url("/watermark"))
        .multipart(form)
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(
        response.text().await.unwrap(),
        "Failed get form part 'watermark': part is missing"
    );
}

#[tokio::test]
async fn test_non_multipart_request() {
    let harness = ServerTestHarness::start(CanvasSize::new(64, 48)).await;

    let response = reqwest::Client::new()
        .post(harness.url("/watermark"))
        .header("content-type", "application/json")
        .body("{}")
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response
        .text()
        .await
        .unwrap()
        .starts_with("Needed multipart data"));
}

#[tokio::test]
async fn test_body_over_limit_is_rejected() {
    let harness = ServerTestHarness::start_with(CanvasSize::new(64, 48), 256).await;

    let response = reqwest::Client::new()
        .post(harness.url("/watermark"))
        .multipart(upload(
            jpeg_bytes(64, 64),
            png_bytes(16, 16, Rgba([1, 2, 3, 4])),
        ))
        .send()
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    assert!(harness.output_files().is_empty());
}

#[tokio::test]
async fn test_concurrent_uploads_get_distinct_files() {
    let harness = ServerTestHarness::start(CanvasSize::new(80, 60)).await;
    let client = reqwest::Client::new();

    let requests = (0..4).map(|_| {
        client
            .post(harness.url("/watermark"))
            .multipart(upload(
                jpeg_bytes(100, 75),
                png_bytes(10, 10, Rgba([255, 0, 0, 80])),
            ))
            .send()
    });
    let responses = futures::future::join_all(requests).await;

    for response in responses {
        assert_eq!(response.unwrap().status(), StatusCode::OK);
    }
    assert_eq!(harness.output_files().len(), 4);
}

#[tokio::test]
async fn test_health_and_metrics_endpoints() {
    let harness = ServerTestHarness::start(CanvasSize::new(64, 48)).await;
    let client = reqwest::Client::new();

    let health = client.get(harness.url("/health")).send().await.unwrap();
    assert_eq!(health.status(), StatusCode::OK);
    assert_eq!(health.text().await.unwrap(), "OK");

    let metrics = client.get(harness.url("/metrics")).send().await.unwrap();
    assert_eq!(metrics.status(), StatusCode::OK);
    assert!(metrics
        .text()
        .await
        .unwrap()
        .contains("image_service_http_responses_total"));
}

#[tokio::test]
async fn test_unknown_route_and_wrong_method() {
    let harness = ServerTestHarness::start(CanvasSize::new(64, 48)).await;
    let client = reqwest::Client::new();

    let missing = client.get(harness.url("/nope")).send().await.unwrap();
    assert_eq!(missing.status(), StatusCode::NOT_FOUND);

    let wrong = client.get(harness.url("/watermark")).send().await.unwrap();
    assert_eq!(wrong.status(), StatusCode::METHOD_NOT_ALLOWED);
}
