//! camera-session: CSI camera acquisition with a trial-read health check
//!
//! A [`CameraSession`] owns one capture handle at a time. It builds a
//! backend-specific [`CaptureTarget`] (a hardware pipeline description or a
//! direct device request), hands it to a [`CaptureProvider`], and validates
//! the result by pulling one trial frame before reporting success. The
//! default build enables the `mock` provider so that binaries compile on any
//! host; the `opencv` feature adds the real `VideoCapture` backed provider.

mod types;
pub use types::{Backend, CameraConfig, CaptureTarget, Frame, PixelFormat};

mod error;
pub use error::{Error, Result};

mod traits;
pub use traits::{CaptureHandle, CaptureProvider};

pub mod pipeline;
pub use pipeline::{PipelineBuilder, SinkPolicy};

mod session;
pub use session::{CameraSession, OpenReport};

pub mod io;
pub mod probe;

#[cfg(feature = "mock")]
mod mock;
#[cfg(feature = "mock")]
pub use mock::{MockBehavior, MockProvider, MockStats};

#[cfg(feature = "opencv")]
mod opencv_backend;
#[cfg(feature = "opencv")]
pub use opencv_backend::OpenCvProvider;
