//! SDL2 Window Display Module
//! Creates an SDL2 window, renders the live camera preview, and shows the
//! most recently decoded payload in the window title.

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use color_eyre::{eyre::eyre, Result};
use flume::Receiver;
use sdl2::event::Event;
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::{Canvas, TextureCreator};
use sdl2::video::{Window, WindowContext};
use tracing::{info, warn};

use crate::capture::{decoder, Frame};

/// Shown until the first payload arrives, and kept if startup failed.
pub const SCAN_PROMPT: &str = "Scan a code";

/// SDL2 Window Display
/// Handles window creation, the event loop, and frame rendering.
pub struct Sdl2Display {
    canvas: Canvas<Window>,
    texture_creator: TextureCreator<WindowContext>,
}

impl Sdl2Display {
    pub fn new(sdl_context: &sdl2::Sdl, width: u32, height: u32) -> Result<Self> {
        let video_subsystem = sdl_context.video().map_err(|e| eyre!(e))?;

        let window_builder = video_subsystem
            .window(SCAN_PROMPT, width, height)
            .position_centered()
            .build()?;

        let canvas_builder = window_builder.into_canvas().present_vsync();

        let canvas = canvas_builder.build()?;
        let texture_creator = canvas.texture_creator();

        Ok(Self {
            canvas,
            texture_creator,
        })
    }

    pub fn render_frame(&mut self, frame: &Frame) -> Result<()> {
        let rgb_data = decoder::to_rgb(&frame.data, &frame.meta)?;

        let width = frame.meta.width;
        let height = frame.meta.height;

        let mut texture = self
            .texture_creator
            .create_texture_streaming(PixelFormatEnum::RGB24, width, height)
            .map_err(|e| eyre!(e))?;

        texture
            .update(None, &rgb_data, (width * 3) as usize)
            .map_err(|e| eyre!(e))?;

        self.canvas.clear();
        self.canvas
            .copy(&texture, None, None)
            .map_err(|e| eyre!(e))?;

        self.canvas.present();
        Ok(())
    }

    /// Event loop. `frames` is `None` when the capture session never started;
    /// the window then stays on the placeholder prompt.
    pub fn run(
        &mut self,
        sdl_context: &sdl2::Sdl,
        frames: Option<Receiver<Frame>>,
        latest_payload: Arc<ArcSwapOption<String>>,
    ) -> Result<()> {
        let mut event_pump = sdl_context.event_pump().map_err(|e| eyre!(e))?;
        let mut shown: Option<Arc<String>> = None;

        'running: loop {
            for event in event_pump.poll_iter() {
                match event {
                    Event::Quit { .. } => {
                        info!("Quit event received");
                        break 'running;
                    }
                    _ => {}
                }
            }

            let current = latest_payload.load_full();
            if current != shown {
                let title: &str = current.as_deref().map(String::as_str).unwrap_or(SCAN_PROMPT);
                self.canvas.window_mut().set_title(title)?;
                shown = current;
            }

            match &frames {
                Some(rx) => match rx.recv_timeout(Duration::from_millis(33)) {
                    Ok(frame) => {
                        if let Err(e) = self.render_frame(&frame) {
                            warn!("failed to render frame: {e}");
                        }
                    }
                    Err(flume::RecvTimeoutError::Timeout) => {}
                    Err(flume::RecvTimeoutError::Disconnected) => {
                        std::thread::sleep(Duration::from_millis(33));
                    }
                },
                None => std::thread::sleep(Duration::from_millis(33)),
            }
        }

        Ok(())
    }
}
