use crate::{CaptureHandle, CaptureProvider, CaptureTarget, Error, Frame, PixelFormat, Result};
use opencv::prelude::*;
use opencv::{core, videoio};
use time::OffsetDateTime;
use tracing::{debug, warn};

/// `VideoCapture` provider: GStreamer API for pipelines, V4L2 for device nodes.
#[derive(Debug, Default)]
pub struct OpenCvProvider;

impl OpenCvProvider {
    pub fn new() -> Self {
        Self
    }
}

impl CaptureProvider for OpenCvProvider {
    fn name(&self) -> &'static str {
        "opencv"
    }

    fn open(&mut self, target: &CaptureTarget) -> Result<Box<dyn CaptureHandle>> {
        let mut cap = match target {
            CaptureTarget::Pipeline(desc) => {
                videoio::VideoCapture::from_file(desc, videoio::CAP_GSTREAMER)
                    .map_err(|e| Error::Backend(e.to_string()))?
            }
            CaptureTarget::Device { path, .. } => {
                videoio::VideoCapture::from_file(path, videoio::CAP_V4L2)
                    .map_err(|e| Error::Backend(e.to_string()))?
            }
        };

        let opened =
            videoio::VideoCapture::is_opened(&cap).map_err(|e| Error::Backend(e.to_string()))?;
        if !opened {
            let _ = cap.release();
            return Err(Error::OpenFailure(format!("VideoCapture did not open {target}")));
        }

        if let CaptureTarget::Device {
            width,
            height,
            framerate,
            ..
        } = target
        {
            // Requests only; the driver may clamp or ignore them.
            request(&mut cap, videoio::CAP_PROP_FRAME_WIDTH, f64::from(*width));
            request(&mut cap, videoio::CAP_PROP_FRAME_HEIGHT, f64::from(*height));
            request(&mut cap, videoio::CAP_PROP_FPS, f64::from(*framerate));
        }

        Ok(Box::new(OpenCvHandle { cap }))
    }
}

fn request(cap: &mut videoio::VideoCapture, prop: i32, value: f64) {
    match cap.set(prop, value) {
        Ok(true) => {}
        Ok(false) => debug!(prop, value, "capture property request ignored"),
        Err(e) => warn!(prop, value, error = %e, "capture property request failed"),
    }
}

struct OpenCvHandle {
    cap: videoio::VideoCapture,
}

impl CaptureHandle for OpenCvHandle {
    fn read(&mut self) -> Result<Frame> {
        let mut mat = core::Mat::default();
        let grabbed = self
            .cap
            .read(&mut mat)
            .map_err(|e| Error::Backend(e.to_string()))?;
        if !grabbed || mat.empty() {
            return Err(Error::ReadFailure("no frame available".into()));
        }
        if mat.typ() != core::CV_8UC3 {
            return Err(Error::ReadFailure(format!(
                "unexpected mat type {} (expected 8-bit BGR)",
                mat.typ()
            )));
        }

        let width = mat.cols() as u32;
        let height = mat.rows() as u32;
        let data = if mat.is_continuous() {
            mat.data_bytes()
                .map_err(|e| Error::Backend(e.to_string()))?
                .to_vec()
        } else {
            mat.try_clone()
                .map_err(|e| Error::Backend(e.to_string()))?
                .data_bytes()
                .map_err(|e| Error::Backend(e.to_string()))?
                .to_vec()
        };

        Ok(Frame {
            width,
            height,
            pixel_format: PixelFormat::Bgr8,
            data,
            ts: Some(OffsetDateTime::now_utc()),
        })
    }

    fn negotiated(&self) -> Option<(u32, u32)> {
        let width = self.cap.get(videoio::CAP_PROP_FRAME_WIDTH).ok()?;
        let height = self.cap.get(videoio::CAP_PROP_FRAME_HEIGHT).ok()?;
        if width > 0.0 && height > 0.0 {
            Some((width as u32, height as u32))
        } else {
            None
        }
    }

    fn release(mut self: Box<Self>) {
        if let Err(e) = self.cap.release() {
            warn!(error = %e, "VideoCapture release failed");
        }
    }
}
