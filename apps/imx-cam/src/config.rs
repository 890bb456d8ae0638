use anyhow::{Context, Result};
use camera_session::{Backend, CameraConfig};
use scene_describe::DescriberConfig;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub camera: CameraConfig,
    pub vision: VisionConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VisionConfig {
    pub describer: DescriberConfig,
    /// Seconds between description requests.
    pub interval_s: f64,
    pub prompt: String,
    /// Capture geometry used by `vision` and `analyze`, which run smaller
    /// frames than `stream`.
    pub width: u32,
    pub height: u32,
}

impl Default for VisionConfig {
    fn default() -> Self {
        Self {
            describer: DescriberConfig::default(),
            interval_s: 2.0,
            prompt: "What do you see? Describe in one sentence.".to_string(),
            width: 640,
            height: 480,
        }
    }
}

impl AppConfig {
    /// Load from YAML, or defaults when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config: {}", path.display()))?;
        let cfg: AppConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing config: {}", path.display()))?;
        Ok(cfg)
    }

    /// Camera config for the vision commands.
    pub fn vision_camera(&self) -> CameraConfig {
        CameraConfig {
            width: self.vision.width,
            height: self.vision.height,
            ..self.camera.clone()
        }
    }
}

/// Camera flags shared by subcommands; set flags override the config file.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct CameraArgs {
    /// Camera device path
    #[arg(long)]
    pub device: Option<String>,
    /// Frame width
    #[arg(long)]
    pub width: Option<u32>,
    /// Frame height
    #[arg(long)]
    pub height: Option<u32>,
    /// Frame rate
    #[arg(long)]
    pub fps: Option<u32>,
    /// Acquisition backend (accelerated or direct)
    #[arg(long)]
    pub backend: Option<Backend>,
    /// Disable the GStreamer pipeline (same as --backend direct)
    #[arg(long, conflicts_with = "backend")]
    pub no_gstreamer: bool,
}

impl CameraArgs {
    pub fn apply(&self, mut cfg: CameraConfig) -> CameraConfig {
        if let Some(device) = &self.device {
            cfg.device = device.clone();
        }
        if let Some(width) = self.width {
            cfg.width = width;
        }
        if let Some(height) = self.height {
            cfg.height = height;
        }
        if let Some(fps) = self.fps {
            cfg.framerate = fps;
        }
        if let Some(backend) = self.backend {
            cfg.backend = backend;
        }
        if self.no_gstreamer {
            cfg.backend = Backend::Direct;
        }
        cfg
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scene_describe::DescriberKind;
    use std::io::Write;

    #[test]
    fn test_defaults_without_file() {
        let cfg = AppConfig::load(None).unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.vision.interval_s, 2.0);
        let vision_cam = cfg.vision_camera();
        assert_eq!((vision_cam.width, vision_cam.height), (640, 480));
        assert_eq!(vision_cam.device, "/dev/video0");
    }

    #[test]
    fn test_load_yaml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "camera:\n  device: /dev/video2\n  backend: direct\n  framerate: 15\nvision:\n  interval_s: 5.0\n  describer:\n    kind: heuristic\n"
        )
        .unwrap();
        let cfg = AppConfig::load(Some(file.path())).unwrap();
        assert_eq!(cfg.camera.device, "/dev/video2");
        assert_eq!(cfg.camera.backend, Backend::Direct);
        assert_eq!(cfg.camera.framerate, 15);
        assert_eq!(cfg.camera.width, 1280);
        assert_eq!(cfg.vision.interval_s, 5.0);
        assert_eq!(cfg.vision.describer.kind, DescriberKind::Heuristic);
    }

    #[test]
    fn test_missing_file_errors() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/imx-cam.yaml"))).unwrap_err();
        assert!(format!("{err:#}").contains("reading config"));
    }

    #[test]
    fn test_cli_overrides() {
        let args = CameraArgs {
            device: Some("/dev/video1".into()),
            width: Some(640),
            height: None,
            fps: Some(15),
            backend: None,
            no_gstreamer: true,
        };
        let cfg = args.apply(CameraConfig::default());
        assert_eq!(cfg.device, "/dev/video1");
        assert_eq!((cfg.width, cfg.height), (640, 720));
        assert_eq!(cfg.framerate, 15);
        assert_eq!(cfg.backend, Backend::Direct);

        let untouched = CameraArgs::default().apply(CameraConfig::default());
        assert_eq!(untouched, CameraConfig::default());
    }
}
