//! Capture lifecycle controller.
//!
//! Owns the one shared mutable resource in the system: the capture session
//! wiring. All structural mutations go through a single async mutex, so no
//! two session-mutating operations can interleave.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::capture::frame::Frame;
use crate::capture::source::FrameSource;
use crate::error::StartError;
use crate::scan::bridge::{DetectionBridge, PayloadStream};
use crate::scan::detector::SymbolDetector;
use crate::scan::feedback::Feedback;
use crate::ScannerConfig;

/// Preview frames are best-effort; a stalled renderer drops frames here
/// rather than stalling capture.
const PREVIEW_QUEUE_DEPTH: usize = 4;

/// Starts the frame source exactly once and gates stream consumption until
/// capture is actually running.
pub struct CaptureService {
    inner: tokio::sync::Mutex<Inner>,
    frame_queue_depth: usize,
}

struct Inner {
    /// Consumed by the detection worker on first start.
    bridge: Option<DetectionBridge>,
    /// Handed out once, and only after a successful start.
    payloads: Option<PayloadStream>,
    preview: Option<flume::Receiver<Frame>>,
    delivery: Option<JoinHandle<()>>,
    worker: Option<JoinHandle<()>>,
    inputs: u32,
    outputs: u32,
    running: bool,
}

impl CaptureService {
    pub fn new(
        config: &ScannerConfig,
        detector: Box<dyn SymbolDetector>,
        feedback: Box<dyn Feedback>,
    ) -> Self {
        let (bridge, payloads) = DetectionBridge::new(detector, feedback);

        Self {
            inner: tokio::sync::Mutex::new(Inner {
                bridge: Some(bridge),
                payloads: Some(payloads),
                preview: None,
                delivery: None,
                worker: None,
                inputs: 0,
                outputs: 0,
                running: false,
            }),
            frame_queue_depth: config.frame_queue_depth,
        }
    }

    /// Acquire a device via `open`, wire it to the detection worker, and
    /// begin continuous frame delivery.
    ///
    /// Idempotent: once the session has an input, further calls no-op
    /// without invoking `open` again.
    pub async fn start<S, O>(&self, open: O) -> Result<(), StartError>
    where
        S: FrameSource,
        O: FnOnce() -> Result<S, StartError>,
    {
        let mut inner = self.inner.lock().await;

        if inner.inputs > 0 {
            debug!("session already has an input, ignoring start");
            return Ok(());
        }

        let mut source = open()?;
        source
            .start_stream()
            .map_err(|e| StartError::Configuration(e.to_string()))?;

        let (frame_tx, frame_rx) = flume::bounded::<Frame>(self.frame_queue_depth);
        let (preview_tx, preview_rx) = flume::bounded::<Frame>(PREVIEW_QUEUE_DEPTH);

        inner.inputs += 1;
        inner.delivery = Some(tokio::spawn(deliver_frames(source, frame_tx, preview_tx)));

        if inner.outputs == 0 {
            if let Some(mut bridge) = inner.bridge.take() {
                // Dedicated worker: frames are detected strictly in arrival
                // order, one at a time, off the async runtime
                inner.worker = Some(tokio::task::spawn_blocking(move || {
                    while let Ok(frame) = frame_rx.recv() {
                        bridge.on_frame(&frame);
                    }
                    debug!("detection worker finished");
                }));
                inner.outputs += 1;
            }
        }

        inner.preview = Some(preview_rx);
        inner.running = true;
        info!("capture session running");
        Ok(())
    }

    /// Stop frame delivery. The detection worker drains and exits once the
    /// in-flight frames are gone; the payload stream then ends.
    pub async fn stop(&self) {
        let mut inner = self.inner.lock().await;

        if let Some(delivery) = inner.delivery.take() {
            delivery.abort();
        }
        inner.worker.take();
        inner.preview.take();
        inner.running = false;
        info!("capture session stopped");
    }

    pub async fn is_running(&self) -> bool {
        self.inner.lock().await.running
    }

    /// Session input/output wiring counts. Stays at (1, 1) across repeated
    /// successful starts.
    pub async fn io_counts(&self) -> (u32, u32) {
        let inner = self.inner.lock().await;
        (inner.inputs, inner.outputs)
    }

    /// Take the decoded-payload stream. `None` before a successful start,
    /// and on every call after the first take: one logical consumer only.
    pub async fn payload_stream(&self) -> Option<PayloadStream> {
        let mut inner = self.inner.lock().await;
        if !inner.running {
            return None;
        }
        inner.payloads.take()
    }

    /// Take the preview frame feed. Same gating as [`Self::payload_stream`].
    pub async fn preview_frames(&self) -> Option<flume::Receiver<Frame>> {
        let mut inner = self.inner.lock().await;
        if !inner.running {
            return None;
        }
        inner.preview.take()
    }
}

/// Frame delivery loop: pulls from the source at its own rate and forwards
/// into the detection queue. Per-frame capture errors are logged and the
/// loop keeps going; the next frame supersedes the failed one.
async fn deliver_frames<S: FrameSource>(
    mut source: S,
    frames: flume::Sender<Frame>,
    preview: flume::Sender<Frame>,
) {
    loop {
        match source.next_frame().await {
            Ok(frame) => {
                let _ = preview.try_send(frame.clone());
                if frames.send_async(frame).await.is_err() {
                    error!("detection worker gone, stopping delivery");
                    break;
                }
            }
            Err(e) => {
                warn!("capture error: {e}");
                tokio::time::sleep(Duration::from_millis(10)).await;
            }
        }
    }
}
