//! Frame-to-payload bridge.
//!
//! Turns each incoming frame into zero or one decoded payload events on a
//! live async stream. Detection errors are per-frame and never fatal: a bad
//! frame is skipped and the next one supersedes it.

use tracing::{debug, warn};

use crate::capture::frame::Frame;
use crate::scan::detector::SymbolDetector;
use crate::scan::feedback::Feedback;

/// Per-frame detection driver and payload publisher.
///
/// Single producer: `on_frame` runs on the detection worker only. The
/// publish side never blocks; if the consumer is gone, events are dropped.
pub struct DetectionBridge {
    detector: Box<dyn SymbolDetector>,
    feedback: Box<dyn Feedback>,
    tx: flume::Sender<String>,
}

/// Live feed of decoded payload strings.
///
/// Lazy and unbounded; once iteration ends there is no replay. One logical
/// consumer is the only supported topology.
pub struct PayloadStream {
    rx: flume::Receiver<String>,
}

impl PayloadStream {
    /// Wait for the next decoded payload. Returns `None` once the producer
    /// side has shut down.
    pub async fn next(&mut self) -> Option<String> {
        self.rx.recv_async().await.ok()
    }
}

impl DetectionBridge {
    pub fn new(
        detector: Box<dyn SymbolDetector>,
        feedback: Box<dyn Feedback>,
    ) -> (Self, PayloadStream) {
        let (tx, rx) = flume::unbounded();
        (
            Self {
                detector,
                feedback,
                tx,
            },
            PayloadStream { rx },
        )
    }

    /// Run detection on one frame and publish the first decoded symbol.
    ///
    /// First candidate wins; no ranking, no dedup against the previous
    /// payload. A detection error is equivalent to an empty result.
    pub fn on_frame(&mut self, frame: &Frame) {
        let candidates = match self.detector.detect(frame) {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!(
                    sequence = frame.meta.sequence,
                    error = %e,
                    "detection failed, skipping frame"
                );
                return;
            }
        };

        let Some(first) = candidates.into_iter().next() else {
            return;
        };

        debug!(
            sequence = frame.meta.sequence,
            symbology = ?first.symbology,
            "decoded symbol"
        );

        self.feedback.signal_success();

        // Consumer may have gone away; later publications are just dropped
        let _ = self.tx.send(first.payload);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::frame::{Frame, PixelFormat};
    use crate::error::DetectError;
    use crate::scan::detector::{Candidate, Symbology};
    use bytes::Bytes;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Detector that replays a script of per-frame outcomes.
    struct ScriptedDetector {
        script: Vec<Result<Vec<Candidate>, DetectError>>,
    }

    impl ScriptedDetector {
        fn new(script: Vec<Result<Vec<Candidate>, DetectError>>) -> Self {
            Self { script }
        }
    }

    impl SymbolDetector for ScriptedDetector {
        fn detect(&mut self, _frame: &Frame) -> Result<Vec<Candidate>, DetectError> {
            self.script.remove(0)
        }
    }

    struct CountingFeedback(Arc<AtomicUsize>);

    impl Feedback for CountingFeedback {
        fn signal_success(&self) {
            self.0.fetch_add(1, Ordering::Relaxed);
        }
    }

    fn frame(sequence: u64) -> Frame {
        Frame::new(Bytes::from_static(&[0u8; 16]), sequence, 4, 4, PixelFormat::Gray8)
    }

    fn qr(payload: &str) -> Candidate {
        Candidate {
            symbology: Symbology::Qr,
            payload: payload.to_string(),
        }
    }

    fn bridge_with(
        script: Vec<Result<Vec<Candidate>, DetectError>>,
    ) -> (DetectionBridge, PayloadStream, Arc<AtomicUsize>) {
        let pulses = Arc::new(AtomicUsize::new(0));
        let (bridge, stream) = DetectionBridge::new(
            Box::new(ScriptedDetector::new(script)),
            Box::new(CountingFeedback(Arc::clone(&pulses))),
        );
        (bridge, stream, pulses)
    }

    #[tokio::test]
    async fn emits_first_candidate_per_frame_in_arrival_order() {
        let (mut bridge, mut stream, _) = bridge_with(vec![
            Ok(vec![qr("first"), qr("second")]),
            Ok(vec![]),
            Ok(vec![qr("third")]),
        ]);

        for seq in 0..3 {
            bridge.on_frame(&frame(seq));
        }
        drop(bridge);

        assert_eq!(stream.next().await.as_deref(), Some("first"));
        assert_eq!(stream.next().await.as_deref(), Some("third"));
        assert_eq!(stream.next().await, None);
    }

    #[tokio::test]
    async fn empty_result_produces_no_event_and_pipeline_continues() {
        let (mut bridge, mut stream, pulses) =
            bridge_with(vec![Ok(vec![]), Ok(vec![qr("ABC123")])]);

        bridge.on_frame(&frame(0));
        bridge.on_frame(&frame(1));
        drop(bridge);

        assert_eq!(stream.next().await.as_deref(), Some("ABC123"));
        assert_eq!(stream.next().await, None);
        assert_eq!(pulses.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn detection_error_is_equivalent_to_no_candidates() {
        let (mut bridge, mut stream, pulses) = bridge_with(vec![
            Err(DetectError::Geometry),
            Ok(vec![qr("after-error")]),
        ]);

        bridge.on_frame(&frame(0));
        bridge.on_frame(&frame(1));
        drop(bridge);

        assert_eq!(stream.next().await.as_deref(), Some("after-error"));
        assert_eq!(stream.next().await, None);
        assert_eq!(pulses.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn consecutive_identical_payloads_are_both_emitted() {
        let (mut bridge, mut stream, pulses) =
            bridge_with(vec![Ok(vec![qr("XYZ")]), Ok(vec![qr("XYZ")])]);

        bridge.on_frame(&frame(0));
        bridge.on_frame(&frame(1));
        drop(bridge);

        assert_eq!(stream.next().await.as_deref(), Some("XYZ"));
        assert_eq!(stream.next().await.as_deref(), Some("XYZ"));
        assert_eq!(stream.next().await, None);
        assert_eq!(pulses.load(Ordering::Relaxed), 2);
    }

    #[tokio::test]
    async fn publishing_after_consumer_dropped_does_not_error() {
        let (mut bridge, stream, pulses) = bridge_with(vec![Ok(vec![qr("orphan")])]);

        drop(stream);
        bridge.on_frame(&frame(0));

        // Feedback still fires; the publication is silently dropped
        assert_eq!(pulses.load(Ordering::Relaxed), 1);
    }
}
