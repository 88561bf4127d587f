//! Success feedback cues.

use std::io::Write;

/// Fire-and-forget cue on a successful decode. No failure mode the caller
/// has to handle.
pub trait Feedback: Send {
    fn signal_success(&self);
}

/// Rings the terminal bell (BEL), the desktop stand-in for a haptic pulse.
pub struct TerminalBell;

impl Feedback for TerminalBell {
    fn signal_success(&self) {
        let mut out = std::io::stdout();
        let _ = out.write_all(b"\x07");
        let _ = out.flush();
    }
}

/// No-op feedback.
pub struct Silent;

impl Feedback for Silent {
    fn signal_success(&self) {}
}
