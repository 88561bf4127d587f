//! V4L2 frame source with memory-mapped buffers

use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tracing::{info, instrument};
use v4l::buffer::Type;
use v4l::capability::Flags as CapFlags;
use v4l::io::traits::CaptureStream;
use v4l::prelude::MmapStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

use crate::{
    capture::frame::{Frame, FrameMetadata, PixelFormat},
    capture::source::FrameSource,
    error::{CaptureError, StartError},
    CaptureConfig,
};

/// V4L2 capture device wired for continuous streaming
pub struct V4l2Capture {
    device: Box<Device>,
    stream: Option<MmapStream<'static>>,
    config: CaptureConfig,
    sequence: u64,
}

impl V4l2Capture {
    /// Acquire the configured device and negotiate the capture format.
    ///
    /// Startup is the only place errors carry a type: an unopenable device is
    /// `DeviceUnavailable`, everything after the open is `Configuration`.
    pub fn open(config: CaptureConfig) -> Result<Self, StartError> {
        info!("Opening V4L2 device: {:?}", config.device);

        let device = Device::with_path(&config.device.path)
            .map_err(|e| StartError::DeviceUnavailable(format!("{}: {e}", config.device.path)))?;

        let caps = device
            .query_caps()
            .map_err(|e| StartError::Configuration(e.to_string()))?;
        info!("Device: {} ({})", caps.card, caps.driver);

        if !caps.capabilities.contains(CapFlags::VIDEO_CAPTURE) {
            return Err(StartError::Configuration(
                "device doesn't support video capture".into(),
            ));
        }

        let mut fmt = device
            .format()
            .map_err(|e| StartError::Configuration(e.to_string()))?;
        fmt.width = config.width;
        fmt.height = config.height;
        fmt.fourcc = match config.format {
            PixelFormat::Mjpeg => FourCC::new(b"MJPG"),
            PixelFormat::Yuyv4 => FourCC::new(b"YUYV"),
            PixelFormat::Gray8 => FourCC::new(b"GREY"),
            PixelFormat::Rgb24 => FourCC::new(b"RGB3"),
        };

        device
            .set_format(&fmt)
            .map_err(|e| StartError::Configuration(e.to_string()))?;

        Ok(Self {
            device: Box::new(device),
            stream: None,
            config,
            sequence: 0,
        })
    }
}

impl FrameSource for V4l2Capture {
    /// Start streaming with memory-mapped buffers
    fn start_stream(&mut self) -> Result<(), CaptureError> {
        let stream =
            MmapStream::with_buffers(&self.device, Type::VideoCapture, self.config.buffer_count)?;

        self.stream = Some(stream);
        info!(
            "Capture stream started with {} buffers",
            self.config.buffer_count
        );
        Ok(())
    }

    /// Dequeue the next frame from the driver
    #[instrument(skip(self))]
    async fn next_frame(&mut self) -> Result<Frame, CaptureError> {
        let timestamp = Instant::now();

        let stream = self.stream.as_mut().ok_or(CaptureError::NotStarted)?;

        let (buf, meta) = stream.next()?;

        // The mmap'd buffer is requeued on the next dequeue; copy out once
        let data = Bytes::copy_from_slice(buf);

        self.sequence += 1;

        let frame_meta = Arc::new(FrameMetadata {
            sequence: self.sequence,
            width: self.config.width,
            height: self.config.height,
            stride: self.config.width,
            format: self.config.format,
            device_timestamp: Some(
                Duration::from_secs(meta.timestamp.sec as u64)
                    + Duration::from_micros(meta.timestamp.usec as u64),
            ),
        });

        Ok(Frame {
            data,
            meta: frame_meta,
            timestamp,
        })
    }
}
