pub mod display;

pub use display::Sdl2Display;
pub use display::SCAN_PROMPT;
