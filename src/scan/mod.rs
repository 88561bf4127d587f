pub mod bridge;
pub mod detector;
pub mod feedback;
pub mod session;

pub use bridge::{DetectionBridge, PayloadStream};
pub use detector::{Candidate, QrDetector, SymbolDetector, Symbology};
pub use feedback::{Feedback, Silent, TerminalBell};
pub use session::CaptureService;
