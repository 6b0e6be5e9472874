// Server module - HTTP/1 listener and request routing
//
// Each accepted connection is served on its own task. Requests to
// `/watermark` are read as multipart uploads and handed to the
// orchestrator; `/health` and `/metrics` answer directly.

pub mod multipart;

use bytes::Bytes;
use futures::FutureExt;
use http::header::{ALLOW, CONTENT_TYPE};
use http::{HeaderValue, Method, Request, Response, StatusCode};
use http_body_util::Full;
use hyper::body::Body;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::ServerConfig;
use crate::constants::{HEALTH_ROUTE, METRICS_ROUTE, WATERMARK_ROUTE};
use crate::error::PipelineError;
use crate::metrics::{export_prometheus, ServiceMetrics};
use crate::orchestrator::{panic_message, CompositionResult, Orchestrator};

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";
const PROMETHEUS_TEXT: &str = "text/plain; version=0.0.4; charset=utf-8";

/// Request handler shared by every connection.
#[derive(Clone)]
pub struct WatermarkService {
    orchestrator: Orchestrator,
    max_body_size: usize,
}

impl WatermarkService {
    pub fn new(orchestrator: Orchestrator, max_body_size: usize) -> Self {
        Self {
            orchestrator,
            max_body_size,
        }
    }

    /// Answer one request. Never fails; every error becomes a response.
    pub async fn handle<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %req.method(),
            path = %req.uri().path()
        );

        async move {
            let response = match AssertUnwindSafe(self.route(req)).catch_unwind().await {
                Ok(response) => response,
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(panic = %message, "Request handler panicked");
                    text_response(
                        StatusCode::INTERNAL_SERVER_ERROR,
                        format!("undefined error {}", message),
                    )
                }
            };

            let status = response.status().as_u16();
            ServiceMetrics::global().record_response(status);
            tracing::info!(status, "Request completed");
            response
        }
        .instrument(span)
        .await
    }

    async fn route<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match (req.method(), req.uri().path()) {
            (&Method::POST, WATERMARK_ROUTE) => self.watermark(req).await,
            (_, WATERMARK_ROUTE) => {
                let mut response = text_response(
                    StatusCode::METHOD_NOT_ALLOWED,
                    "Method Not Allowed".to_string(),
                );
                response
                    .headers_mut()
                    .insert(ALLOW, HeaderValue::from_static("POST"));
                response
            }
            (&Method::GET, HEALTH_ROUTE) => text_response(StatusCode::OK, "OK".to_string()),
            (&Method::GET, METRICS_ROUTE) => {
                let mut response = text_response(StatusCode::OK, export_prometheus());
                response
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(PROMETHEUS_TEXT));
                response
            }
            _ => text_response(StatusCode::NOT_FOUND, "Not Found".to_string()),
        }
    }

    async fn watermark<B>(&self, req: Request<B>) -> Response<Full<Bytes>>
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        match self.compose_upload(req).await {
            Ok(stored) => text_response(
                StatusCode::OK,
                format!("Success. File saved as {}", stored.path.display()),
            ),
            Err(err) => error_response(&err),
        }
    }

    async fn compose_upload<B>(&self, req: Request<B>) -> CompositionResult
    where
        B: Body<Data = Bytes> + Send + 'static,
        B::Error: Into<Box<dyn std::error::Error + Send + Sync>>,
    {
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);

        let parts = async {
            let boundary = multipart::boundary(content_type.as_deref())?;
            let body = multipart::collect_body(req.into_body(), self.max_body_size).await?;
            multipart::read_parts(boundary, body).await
        }
        .await
        .map_err(|err| {
            tracing::warn!(error = %err, kind = err.kind(), "Rejected upload");
            err
        })?;

        tracing::debug!(
            image_bytes = parts.image.len(),
            watermark_bytes = parts.watermark.len(),
            "Upload received"
        );

        self.orchestrator.process(parts).await
    }
}

fn text_response(status: StatusCode, body: String) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(body)));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_PLAIN));
    response
}

fn error_response(err: &PipelineError) -> Response<Full<Bytes>> {
    let status =
        StatusCode::from_u16(err.to_http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    text_response(status, err.to_string())
}

/// Bound listener plus the service answering on it.
pub struct WatermarkServer {
    listener: TcpListener,
    service: WatermarkService,
}

impl WatermarkServer {
    /// Bind to `server.address:server.port`. Port 0 picks a free port.
    pub async fn bind(server: &ServerConfig, orchestrator: Orchestrator) -> std::io::Result<Self> {
        let listener = TcpListener::bind(server.listen_address()).await?;
        Ok(Self {
            listener,
            service: WatermarkService::new(orchestrator, server.max_body_size),
        })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Serve until the process is stopped.
    pub async fn run(self) -> std::io::Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Serve until `shutdown` resolves. Connections already accepted finish
    /// on their own tasks.
    pub async fn run_until<F>(self, shutdown: F) -> std::io::Result<()>
    where
        F: Future<Output = ()>,
    {
        let addr = self.local_addr()?;
        tracing::info!(address = %addr, "Listening for requests");

        let service = Arc::new(self.service);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!(address = %addr, "Shutting down listener");
                    return Ok(());
                }
                accepted = self.listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(e) => {
                            tracing::warn!(error = %e, "Failed to accept connection");
                            continue;
                        }
                    };

                    let service = Arc::clone(&service);
                    tokio::spawn(async move {
                        let io = TokioIo::new(stream);
                        let handler = service_fn(move |req| {
                            let service = Arc::clone(&service);
                            async move { Ok::<_, Infallible>(service.handle(req).await) }
                        });

                        if let Err(e) = http1::Builder::new().serve_connection(io, handler).await {
                            tracing::debug!(peer = %peer, error = %e, "Connection closed with error");
                        }
                    });
                }
            }
        }
    }
}
