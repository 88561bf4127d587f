//! Error taxonomy. Startup errors are the only class that crosses the
//! component boundary; per-frame errors stay local to the pipeline.

use thiserror::Error;

/// Raised by [`crate::scan::CaptureService::start`] and nowhere else.
#[derive(Debug, Error)]
pub enum StartError {
    #[error("no capture device available: {0}")]
    DeviceUnavailable(String),

    #[error("capture pipeline configuration failed: {0}")]
    Configuration(String),
}

/// Per-frame errors from a running frame source. The delivery loop logs
/// these and keeps going; the next frame supersedes the failed one.
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("capture i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("capture stream not started")]
    NotStarted,
}

/// Pixel-format conversion failures.
#[derive(Debug, Error)]
pub enum FrameDecodeError {
    #[error("jpeg decode failed: {0}")]
    Jpeg(#[from] jpeg_decoder::Error),

    #[error("jpeg pixel layout {0} is not supported")]
    JpegLayout(&'static str),

    #[error("frame data truncated: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },
}

/// Detection failures. Always recovered inside the bridge: a frame that
/// errors is treated the same as a frame with no symbols.
#[derive(Debug, Error)]
pub enum DetectError {
    #[error("frame unusable for detection: {0}")]
    Frame(#[from] FrameDecodeError),

    #[error("frame dimensions do not match pixel buffer")]
    Geometry,
}

/// Configuration load/parse failure.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ConfigError(#[from] config::ConfigError);
