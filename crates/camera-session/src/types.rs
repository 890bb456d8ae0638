use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use time::OffsetDateTime;

use crate::{Error, Result};

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum PixelFormat {
    Bgr8,
    Rgb8,
    Gray8,
}

impl PixelFormat {
    pub fn channels(self) -> usize {
        match self {
            PixelFormat::Bgr8 | PixelFormat::Rgb8 => 3,
            PixelFormat::Gray8 => 1,
        }
    }
}

/// One decoded image buffer, row-major and tightly packed.
#[derive(Clone, Debug)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub pixel_format: PixelFormat,
    pub data: Vec<u8>,
    pub ts: Option<OffsetDateTime>,
}

impl Frame {
    /// Expected byte length for the frame's geometry and format.
    pub fn expected_len(&self) -> usize {
        self.width as usize * self.height as usize * self.pixel_format.channels()
    }

    /// 8-bit luma plane (BT.601 weights), one byte per pixel.
    pub fn gray_luma(&self) -> Vec<u8> {
        match self.pixel_format {
            PixelFormat::Gray8 => self.data.clone(),
            PixelFormat::Bgr8 => self
                .data
                .chunks_exact(3)
                .map(|px| luma(px[2], px[1], px[0]))
                .collect(),
            PixelFormat::Rgb8 => self
                .data
                .chunks_exact(3)
                .map(|px| luma(px[0], px[1], px[2]))
                .collect(),
        }
    }
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let y = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
    y.round().clamp(0.0, 255.0) as u8
}

/// Acquisition strategy.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// Hardware pipeline (Argus source, NVMM conversion, appsink).
    #[default]
    Accelerated,
    /// Raw V4L2 device node with best-effort capability requests.
    Direct,
}

impl Backend {
    pub fn as_str(self) -> &'static str {
        match self {
            Backend::Accelerated => "accelerated",
            Backend::Direct => "direct",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Backend {
    type Err = String;

    fn from_str(s: &str) -> core::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "accelerated" | "gstreamer" | "gst" => Ok(Backend::Accelerated),
            "direct" | "v4l2" => Ok(Backend::Direct),
            other => Err(format!(
                "unknown backend '{other}' (expected accelerated or direct)"
            )),
        }
    }
}

/// Requested camera parameters. Immutable once handed to a session.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    /// Device node, e.g. "/dev/video0"
    pub device: String,
    pub width: u32,
    pub height: u32,
    pub framerate: u32,
    pub backend: Backend,
    /// Argus sensor index for the accelerated pipeline; `None` omits it.
    pub sensor_id: Option<u32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            device: "/dev/video0".to_string(),
            width: 1280,
            height: 720,
            framerate: 30,
            backend: Backend::Accelerated,
            sensor_id: Some(0),
        }
    }
}

impl CameraConfig {
    pub fn new(device: impl Into<String>, width: u32, height: u32, framerate: u32) -> Self {
        Self {
            device: device.into(),
            width,
            height,
            framerate,
            ..Self::default()
        }
    }

    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_sensor_id(mut self, sensor_id: Option<u32>) -> Self {
        self.sensor_id = sensor_id;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.device.trim().is_empty() {
            return Err(Error::InvalidConfig("device must not be empty".into()));
        }
        if self.width == 0 || self.height == 0 {
            return Err(Error::InvalidConfig(format!(
                "geometry must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.framerate == 0 {
            return Err(Error::InvalidConfig("framerate must be positive".into()));
        }
        Ok(())
    }
}

/// What a provider is asked to open.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum CaptureTarget {
    /// Textual media pipeline description.
    Pipeline(String),
    /// Device node plus width/height/framerate requests the driver may clamp.
    Device {
        path: String,
        width: u32,
        height: u32,
        framerate: u32,
    },
}

impl fmt::Display for CaptureTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureTarget::Pipeline(desc) => write!(f, "pipeline `{desc}`"),
            CaptureTarget::Device {
                path,
                width,
                height,
                framerate,
            } => write!(f, "device {path} ({width}x{height} @ {framerate}fps)"),
        }
    }
}
