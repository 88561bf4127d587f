//! Frame source abstraction over capture backends.

use std::future::Future;

use crate::capture::frame::Frame;
use crate::error::CaptureError;

/// A started-once, push-rate-driven producer of frames.
///
/// The source owns its device handle and delivers frames in capture order.
/// There is no flow-control API: when the consumer falls behind, the driver
/// drops frames on its side, never the pipeline.
pub trait FrameSource: Send + 'static {
    /// Begin streaming. Must be called once before the first `next_frame`.
    fn start_stream(&mut self) -> Result<(), CaptureError>;

    /// Dequeue the next frame, suspending until one is available.
    fn next_frame(&mut self) -> impl Future<Output = Result<Frame, CaptureError>> + Send;
}
