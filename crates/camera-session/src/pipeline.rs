//! Accelerated pipeline description builder.
//!
//! The pipeline reads the sensor through `nvarguscamerasrc` into NVMM
//! memory as NV12, converts to BGRx with the hardware converter, drops the
//! padding byte with `videoconvert`, and ends in an `appsink`.

use crate::CameraConfig;

/// Buffering policy of the terminating `appsink`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct SinkPolicy {
    pub max_buffers: Option<u32>,
    pub drop: bool,
    pub sync: bool,
}

impl Default for SinkPolicy {
    /// One buffer, drop on overflow, no clock sync: the freshest frame wins.
    fn default() -> Self {
        Self {
            max_buffers: Some(1),
            drop: true,
            sync: false,
        }
    }
}

impl SinkPolicy {
    /// Plain `appsink` with GStreamer's own defaults.
    pub fn unbounded() -> Self {
        Self {
            max_buffers: None,
            drop: false,
            sync: true,
        }
    }

    fn render(&self) -> String {
        let mut out = String::from("appsink");
        if let Some(n) = self.max_buffers {
            out.push_str(&format!(" max-buffers={n}"));
        }
        if self.drop {
            out.push_str(" drop=true");
        }
        if !self.sync {
            out.push_str(" sync=false");
        }
        out
    }
}

#[derive(Clone, Debug)]
pub struct PipelineBuilder {
    width: u32,
    height: u32,
    framerate: u32,
    sensor_id: Option<u32>,
    scaled_output: bool,
    sink: SinkPolicy,
}

impl PipelineBuilder {
    pub fn new(width: u32, height: u32, framerate: u32) -> Self {
        Self {
            width,
            height,
            framerate,
            sensor_id: Some(0),
            scaled_output: true,
            sink: SinkPolicy::default(),
        }
    }

    pub fn from_config(config: &CameraConfig) -> Self {
        Self::new(config.width, config.height, config.framerate).sensor_id(config.sensor_id)
    }

    pub fn sensor_id(mut self, sensor_id: Option<u32>) -> Self {
        self.sensor_id = sensor_id;
        self
    }

    /// When false, the converter output caps carry only the format and the
    /// converter keeps the source geometry.
    pub fn scaled_output(mut self, scaled: bool) -> Self {
        self.scaled_output = scaled;
        self
    }

    pub fn sink(mut self, sink: SinkPolicy) -> Self {
        self.sink = sink;
        self
    }

    pub fn build(&self) -> String {
        let source = match self.sensor_id {
            Some(id) => format!("nvarguscamerasrc sensor-id={id}"),
            None => "nvarguscamerasrc".to_string(),
        };
        let nvmm_caps = format!(
            "video/x-raw(memory:NVMM), width={}, height={}, format=NV12, framerate={}/1",
            self.width, self.height, self.framerate
        );
        let bgrx_caps = if self.scaled_output {
            format!(
                "video/x-raw, width={}, height={}, format=BGRx",
                self.width, self.height
            )
        } else {
            "video/x-raw, format=BGRx".to_string()
        };
        [
            source,
            nvmm_caps,
            "nvvidconv".to_string(),
            bgrx_caps,
            "videoconvert".to_string(),
            "video/x-raw, format=BGR".to_string(),
            self.sink.render(),
        ]
        .join(" ! ")
    }
}
