//! Scanline: live camera QR scanner with an async payload stream

use std::path::Path;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use color_eyre::{eyre::eyre, Result};
use tracing::{error, info};

use scanline::capture::V4l2Capture;
use scanline::display::Sdl2Display;
use scanline::error::StartError;
use scanline::scan::{CaptureService, Feedback, QrDetector, Silent, TerminalBell};
use scanline::{load_config, utils, Config};

const CONFIG_FILE: &str = "scanline.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize error handling and logging
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter("scanline=debug")
        .with_timer(tracing_subscriber::fmt::time::uptime())
        .init();

    info!("Scanline launching...");

    // Load configuration
    let config_path = Path::new(CONFIG_FILE);
    let config = load_config(config_path.exists().then_some(config_path))?;
    scanline::CONFIG.store(Arc::new(config.clone()));

    let detector = Box::new(QrDetector::new(config.scanner.symbologies.clone()));
    let feedback: Box<dyn Feedback> = if config.scanner.bell {
        Box::new(TerminalBell)
    } else {
        Box::new(Silent)
    };

    let service = CaptureService::new(&config.scanner, detector, feedback);

    // Latest decoded payload, shared with the display loop
    let latest = Arc::new(ArcSwapOption::<String>::empty());
    let mut preview = None;

    match start_capture(&service, &config).await {
        Ok(()) => {
            if let Some(mut payloads) = service.payload_stream().await {
                let latest = Arc::clone(&latest);
                tokio::spawn(async move {
                    while let Some(code) = payloads.next().await {
                        info!(%code, "scanned");
                        latest.store(Some(Arc::new(code)));
                    }
                });
            }
            preview = service.preview_frames().await;
        }
        // Fatal to the startup attempt only; the window stays on the prompt
        Err(e) => error!("capture startup failed: {e}"),
    }

    let sdl_context = sdl2::init().map_err(|e| eyre!(e))?;
    let mut display =
        Sdl2Display::new(&sdl_context, config.display.width, config.display.height)?;
    display.run(&sdl_context, preview, latest)?;

    service.stop().await;
    info!("Scanline shutting down");
    Ok(())
}

/// Resolve the capture device (auto-detecting when unset) and start the
/// session with it.
async fn start_capture(service: &CaptureService, config: &Config) -> Result<(), StartError> {
    let mut capture_config = config.capture.clone();

    if capture_config.device.path.is_empty() {
        let device = utils::auto_detect_device().await?;
        info!("Using capture device: {:?}", device);
        capture_config.format = device.format;
        capture_config.device = device;
    }

    service
        .start(move || V4l2Capture::open(capture_config))
        .await
}
