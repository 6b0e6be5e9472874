//! Composition orchestrator.
//!
//! Runs one composition request off the request-handling task and resolves
//! exactly one outcome for it.
//!
//! # Flow
//!
//! ```text
//! caller task                        blocking pool
//! ───────────                        ─────────────
//! run() ── spawn_blocking ─────────▶ decode → overlay → put_watermark → sink
//!   │                                        │
//!   └─ timeout(recv) ◀── Completion ─────────┘  succeed(path) | fail(err)
//! ```
//!
//! The pipeline owns a [`Completion`] whose `succeed` and `fail` both consume
//! it, so at most one outcome can ever be sent. The waiting side turns a
//! panic, a dropped sender, or an elapsed deadline into a failure of its own.
//!
//! A request never ends with both a failure and a stored file. The pipeline
//! skips the sink once nobody waits for it (deadline passed, client gone),
//! and an image stored after the waiter gave up is discarded again.

use bytes::Bytes;
use image::RgbaImage;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::oneshot;
use tracing::Instrument;

use crate::codec::{decode_part, ImagePart};
use crate::error::PipelineError;
use crate::metrics::ServiceMetrics;
use crate::sink::{OutputSink, StoredImage};
use crate::watermark::Transformer;

/// Outcome of one composition request.
pub type CompositionResult = Result<StoredImage, PipelineError>;

/// Fixed size of every canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanvasSize {
    pub width: u32,
    pub height: u32,
}

impl CanvasSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// A fully transparent canvas of this size.
    pub fn allocate(&self) -> RgbaImage {
        RgbaImage::new(self.width, self.height)
    }
}

/// Already decoded inputs of one composition.
#[derive(Debug, Clone)]
pub struct CompositionRequest {
    pub background: RgbaImage,
    pub watermark: RgbaImage,
}

/// Raw bytes of the two uploaded parts, not yet decoded.
#[derive(Debug, Clone)]
pub struct EncodedParts {
    pub image: Bytes,
    pub watermark: Bytes,
}

/// Single-use sender of a composition outcome.
pub struct Completion {
    tx: oneshot::Sender<CompositionResult>,
}

impl Completion {
    pub fn channel() -> (Self, oneshot::Receiver<CompositionResult>) {
        let (tx, rx) = oneshot::channel();
        (Self { tx }, rx)
    }

    /// True once the receiving side stopped waiting.
    pub fn is_abandoned(&self) -> bool {
        self.tx.is_closed()
    }

    /// Deliver a stored image. Hands it back when nobody receives it, so the
    /// caller can discard it.
    pub fn succeed(self, stored: StoredImage) -> Result<(), StoredImage> {
        match self.resolve(Ok(stored)) {
            Some(Ok(stored)) => Err(stored),
            _ => Ok(()),
        }
    }

    pub fn fail(self, err: PipelineError) {
        self.resolve(Err(err));
    }

    fn resolve(self, result: CompositionResult) -> Option<CompositionResult> {
        // The receiver is gone once the caller timed out; the outcome is returned.
        match self.tx.send(result) {
            Ok(()) => None,
            Err(late) => {
                tracing::debug!(
                    ok = late.is_ok(),
                    "Composition finished after its caller stopped waiting"
                );
                Some(late)
            }
        }
    }
}

/// Runs compositions on tokio's blocking pool.
#[derive(Clone)]
pub struct Orchestrator {
    transformer: Arc<dyn Transformer>,
    sink: Arc<dyn OutputSink>,
    canvas: CanvasSize,
    timeout: Duration,
}

impl Orchestrator {
    pub fn new(
        transformer: Arc<dyn Transformer>,
        sink: Arc<dyn OutputSink>,
        canvas: CanvasSize,
        timeout: Duration,
    ) -> Self {
        Self {
            transformer,
            sink,
            canvas,
            timeout,
        }
    }

    /// Compose already decoded images and store the result.
    pub async fn compose(&self, request: CompositionRequest) -> CompositionResult {
        let transformer = Arc::clone(&self.transformer);
        let sink = Arc::clone(&self.sink);
        let canvas = self.canvas;

        self.run(move |completion| {
            compose_and_store(
                transformer.as_ref(),
                sink.as_ref(),
                canvas,
                &request.background,
                &request.watermark,
                completion,
            )
        })
        .await
    }

    /// Decode both parts, compose them and store the result.
    pub async fn process(&self, parts: EncodedParts) -> CompositionResult {
        let transformer = Arc::clone(&self.transformer);
        let sink = Arc::clone(&self.sink);
        let canvas = self.canvas;

        self.run(move |completion| {
            let background = decode_part(ImagePart::Image, &parts.image)?;
            let watermark = decode_part(ImagePart::Watermark, &parts.watermark)?;
            compose_and_store(
                transformer.as_ref(),
                sink.as_ref(),
                canvas,
                &background,
                &watermark,
                completion,
            )
        })
        .await
    }

    async fn run<F>(&self, pipeline: F) -> CompositionResult
    where
        F: FnOnce(&Completion) -> CompositionResult + Send + 'static,
    {
        let started = Instant::now();
        let (completion, mut outcome) = Completion::channel();
        let span = tracing::Span::current();
        let sink = Arc::clone(&self.sink);

        tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            match panic::catch_unwind(AssertUnwindSafe(|| pipeline(&completion))) {
                Ok(Ok(stored)) => {
                    if let Err(unclaimed) = completion.succeed(stored) {
                        discard_unclaimed(sink.as_ref(), &unclaimed);
                    }
                }
                Ok(Err(err)) => completion.fail(err),
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    tracing::error!(panic = %message, "Composition pipeline panicked");
                    completion.fail(PipelineError::internal(format!(
                        "undefined error {}",
                        message
                    )));
                }
            }
        });

        let result = match tokio::time::timeout(self.timeout, &mut outcome)
            .instrument(tracing::debug_span!("await_composition"))
            .await
        {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(PipelineError::internal(
                "composition pipeline ended without an outcome",
            )),
            Err(_) => {
                // No outcome can be sent after close; one that landed just
                // before the deadline is not reported, so its file goes too.
                outcome.close();
                if let Ok(Ok(unclaimed)) = outcome.try_recv() {
                    discard_unclaimed(self.sink.as_ref(), &unclaimed);
                }
                Err(PipelineError::Timeout {
                    timeout_ms: self.timeout.as_millis() as u64,
                })
            }
        };

        let elapsed = started.elapsed();
        match &result {
            Ok(stored) => {
                tracing::info!(
                    path = %stored.path.display(),
                    duration_ms = elapsed.as_millis() as u64,
                    "Composition stored"
                );
                ServiceMetrics::global().record_composition("success", elapsed);
            }
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    kind = err.kind(),
                    duration_ms = elapsed.as_millis() as u64,
                    "Composition failed"
                );
                ServiceMetrics::global().record_composition(err.kind(), elapsed);
            }
        }

        result
    }
}

/// The pipeline body: allocate, overlay, watermark, store.
///
/// Any step failing ends the pipeline; nothing is stored in that case.
/// Nothing is stored either when `completion` has been abandoned.
pub fn compose_and_store(
    transformer: &dyn Transformer,
    sink: &dyn OutputSink,
    canvas_size: CanvasSize,
    background: &RgbaImage,
    watermark: &RgbaImage,
    completion: &Completion,
) -> CompositionResult {
    let mut canvas = canvas_size.allocate();
    transformer.overlay(&mut canvas, background)?;
    transformer.put_watermark(&mut canvas, watermark)?;

    if completion.is_abandoned() {
        tracing::debug!("Caller stopped waiting, skipping store");
        return Err(PipelineError::Abandoned);
    }
    Ok(sink.store(&canvas)?)
}

fn discard_unclaimed(sink: &dyn OutputSink, stored: &StoredImage) {
    if let Err(e) = sink.discard(stored) {
        tracing::warn!(error = %e, "Failed to discard unclaimed image");
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
