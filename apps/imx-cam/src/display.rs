//! Live preview window with an FPS overlay.

use camera_session::Frame;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum KeyAction {
    Quit,
    Snapshot,
}

#[cfg_attr(not(feature = "opencv"), allow(dead_code))]
pub fn key_action(code: i32) -> Option<KeyAction> {
    match (code & 0xFF) as u8 {
        b'q' => Some(KeyAction::Quit),
        b's' => Some(KeyAction::Snapshot),
        _ => None,
    }
}

#[cfg(feature = "opencv")]
pub struct Preview {
    title: String,
}

#[cfg(feature = "opencv")]
impl Preview {
    pub fn new(title: &str) -> anyhow::Result<Self> {
        opencv::highgui::named_window(title, opencv::highgui::WINDOW_AUTOSIZE)?;
        Ok(Self {
            title: title.to_string(),
        })
    }

    /// Show `frame` and poll the keyboard for one millisecond.
    pub fn show(&mut self, frame: &Frame, fps: f64) -> anyhow::Result<Option<KeyAction>> {
        use opencv::prelude::*;
        use opencv::{core, highgui, imgproc};

        let channels = frame.pixel_format.channels() as i32;
        let mut mat = core::Mat::from_slice(&frame.data)?
            .reshape(channels, frame.height as i32)?
            .try_clone()?;
        if frame.pixel_format == camera_session::PixelFormat::Rgb8 {
            let mut bgr = core::Mat::default();
            imgproc::cvt_color(&mat, &mut bgr, imgproc::COLOR_RGB2BGR, 0)?;
            mat = bgr;
        }
        imgproc::put_text(
            &mut mat,
            &format!("FPS: {fps:.1}"),
            core::Point::new(10, 30),
            imgproc::FONT_HERSHEY_SIMPLEX,
            1.0,
            core::Scalar::new(0.0, 255.0, 0.0, 0.0),
            2,
            imgproc::LINE_8,
            false,
        )?;
        highgui::imshow(&self.title, &mat)?;
        let key = highgui::wait_key(1)?;
        Ok(if key < 0 { None } else { key_action(key) })
    }
}

#[cfg(feature = "opencv")]
impl Drop for Preview {
    fn drop(&mut self) {
        let _ = opencv::highgui::destroy_all_windows();
    }
}

/// Headless builds have no window; the stream loop runs without preview.
#[cfg(not(feature = "opencv"))]
pub struct Preview;

#[cfg(not(feature = "opencv"))]
impl Preview {
    pub fn new(_title: &str) -> anyhow::Result<Self> {
        anyhow::bail!("preview window requires the opencv feature")
    }

    pub fn show(&mut self, _frame: &Frame, _fps: f64) -> anyhow::Result<Option<KeyAction>> {
        Ok(None)
    }
}
