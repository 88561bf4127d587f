//! Symbol detection over raw frames.

use image::GrayImage;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::capture::decoder;
use crate::capture::frame::Frame;
use crate::error::DetectError;

/// Symbologies the scanner can be restricted to.
///
/// The production detector decodes QR only; the enum is non-exhaustive so an
/// allow-list survives the addition of further symbologies.
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Symbology {
    Qr,
}

/// One decoded symbol from one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub symbology: Symbology,
    pub payload: String,
}

/// Synchronous per-frame detection.
///
/// Implementations treat the frame as read-only and ephemeral; nothing may
/// be retained past the call. A recoverable error means the frame was
/// unusable, not that the detector is broken.
pub trait SymbolDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Candidate>, DetectError>;
}

/// QR detector backed by `rqrr`.
///
/// Converts the frame to a luma plane, locates finder grids, and decodes
/// each one. Grids that fail to decode are skipped, not errors.
pub struct QrDetector {
    allowed: Option<Vec<Symbology>>,
}

impl QrDetector {
    /// `allowed` is the caller-specified symbology allow-list; `None` places
    /// no restriction.
    pub fn new(allowed: Option<Vec<Symbology>>) -> Self {
        Self { allowed }
    }

    fn allows(&self, symbology: Symbology) -> bool {
        match &self.allowed {
            Some(list) => list.contains(&symbology),
            None => true,
        }
    }
}

impl Default for QrDetector {
    fn default() -> Self {
        Self::new(None)
    }
}

impl SymbolDetector for QrDetector {
    fn detect(&mut self, frame: &Frame) -> Result<Vec<Candidate>, DetectError> {
        if !self.allows(Symbology::Qr) {
            return Ok(Vec::new());
        }

        let luma = decoder::to_luma(&frame.data, &frame.meta)?;
        let image = GrayImage::from_raw(frame.meta.width, frame.meta.height, luma)
            .ok_or(DetectError::Geometry)?;

        let mut prepared = rqrr::PreparedImage::prepare(image);
        let grids = prepared.detect_grids();
        trace!(
            sequence = frame.meta.sequence,
            grids = grids.len(),
            "grid detection complete"
        );

        let mut candidates = Vec::with_capacity(grids.len());
        for grid in grids {
            match grid.decode() {
                Ok((_meta, payload)) => candidates.push(Candidate {
                    symbology: Symbology::Qr,
                    payload,
                }),
                Err(e) => {
                    debug!(error = %e, "failed to decode located grid");
                }
            }
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::frame::PixelFormat;
    use bytes::Bytes;

    fn gray_frame(fill: u8, width: u32, height: u32) -> Frame {
        Frame::new(
            Bytes::from(vec![fill; (width * height) as usize]),
            1,
            width,
            height,
            PixelFormat::Gray8,
        )
    }

    #[test]
    fn blank_frame_yields_no_candidates() {
        let mut detector = QrDetector::default();
        let candidates = detector.detect(&gray_frame(255, 64, 64)).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn empty_allow_list_disables_detection() {
        let mut detector = QrDetector::new(Some(vec![]));
        // Garbage MJPEG data would error if it were ever decoded
        let frame = Frame::new(Bytes::from_static(&[0xde, 0xad]), 1, 64, 64, PixelFormat::Mjpeg);
        let candidates = detector.detect(&frame).unwrap();
        assert!(candidates.is_empty());
    }

    #[test]
    fn undecodable_frame_is_an_error_not_a_panic() {
        let mut detector = QrDetector::default();
        let frame = Frame::new(Bytes::from_static(&[0u8; 4]), 1, 64, 64, PixelFormat::Gray8);
        assert!(detector.detect(&frame).is_err());
    }
}
