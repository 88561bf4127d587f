pub mod decoder;
pub mod frame;
pub mod source;
pub mod v4l2;

pub use frame::Frame;
pub use frame::PixelFormat;
pub use source::FrameSource;
pub use v4l2::V4l2Capture;
