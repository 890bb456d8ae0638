use crate::{CaptureTarget, Frame, Result};

/// Opaque capture primitive able to turn a target into a live stream.
pub trait CaptureProvider {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Acquire a stream for `target`. No frame is read here.
    fn open(&mut self, target: &CaptureTarget) -> Result<Box<dyn CaptureHandle>>;
}

/// An open capture stream. `release` consumes the handle, so it runs at most once.
pub trait CaptureHandle {
    /// Pull the next frame.
    fn read(&mut self) -> Result<Frame>;

    /// Geometry the driver actually negotiated, when the backend can report it.
    fn negotiated(&self) -> Option<(u32, u32)> {
        None
    }

    /// Release the underlying stream.
    fn release(self: Box<Self>);
}
