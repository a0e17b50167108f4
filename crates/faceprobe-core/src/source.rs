//! Frame source port — the session's view of a camera.

use crate::frame::Frame;
use thiserror::Error;

/// Transient capture failure. Never fatal: the session absorbs these and
/// retries up to its attempt bound.
#[derive(Error, Debug)]
pub enum CaptureFailure {
    #[error("failed to read frame: {0}")]
    ReadFailed(String),
    #[error("frame too dark to analyze (mean luminance {luminance:.1})")]
    TooDark { luminance: f64 },
}

/// Source of raw frames. Opening the device is the implementation
/// constructor's concern and fails fatally; each `read` is an independent
/// attempt that may transiently fail.
pub trait FrameSource {
    fn read(&mut self) -> Result<Frame, CaptureFailure>;

    /// Release the underlying device. The session calls this exactly once,
    /// on every exit path.
    fn close(&mut self);
}
