pub mod capture;
pub mod display;
pub mod error;
pub mod scan;
pub mod utils;

use std::path::Path;

use arc_swap::ArcSwap;
use capture::frame::PixelFormat;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::scan::detector::Symbology;
use crate::utils::FoundDevice;

/// Global configuration that can be atomically swapped at runtime
pub static CONFIG: once_cell::sync::Lazy<ArcSwap<Config>> =
    once_cell::sync::Lazy::new(|| ArcSwap::from_pointee(Config::default()));

/// System configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub capture: CaptureConfig,
    pub scanner: ScannerConfig,
    pub display: DisplayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Capture device; an empty path triggers auto-detection at startup.
    pub device: FoundDevice,
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub format: PixelFormat,
    pub buffer_count: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Symbology allow-list for the detector. `None` means no restriction.
    pub symbologies: Option<Vec<Symbology>>,
    /// Depth of the frame queue between capture and detection. When it fills,
    /// backpressure reaches the driver, which drops frames upstream.
    pub frame_queue_depth: usize,
    /// Ring a terminal bell on each decoded symbol.
    pub bell: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DisplayConfig {
    pub width: u32,
    pub height: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            capture: CaptureConfig {
                device: FoundDevice::new(String::new(), PixelFormat::Mjpeg),
                width: 800,
                height: 600,
                fps: 30,
                format: PixelFormat::Mjpeg,
                buffer_count: 4,
            },
            scanner: ScannerConfig {
                symbologies: None,
                frame_queue_depth: 8,
                bell: true,
            },
            display: DisplayConfig {
                width: 800,
                height: 600,
            },
        }
    }
}

/// Load configuration, layering an optional TOML file over the defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut builder =
        config::Config::builder().add_source(config::Config::try_from(&Config::default())?);

    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }

    Ok(builder.build()?.try_deserialize()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn load_without_file_yields_defaults() {
        let config = load_config(None).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn default_scanner_allows_all_symbologies() {
        let config = Config::default();
        assert!(config.scanner.symbologies.is_none());
    }
}
