//! Capability probes, run once at startup and passed down as configuration.

use serde::Serialize;
use std::io::Read;
use std::path::Path;
use std::process::{Command, Stdio};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

const V4L2_CTL_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum Availability {
    Available,
    Missing(String),
}

impl Availability {
    pub fn is_available(&self) -> bool {
        matches!(self, Availability::Available)
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct CaptureCapabilities {
    pub device: String,
    pub device_present: bool,
    /// OpenCV capture provider compiled in.
    pub opencv: Availability,
    /// GStreamer support inside the linked OpenCV.
    pub gstreamer: Availability,
}

impl CaptureCapabilities {
    pub fn can_capture(&self) -> bool {
        self.opencv.is_available()
    }
}

pub fn probe_capture(device: &str) -> CaptureCapabilities {
    let device_present = Path::new(device).exists();
    let (opencv, gstreamer) = probe_opencv();
    tracing::debug!(device, device_present, ?opencv, ?gstreamer, "capture probe");
    CaptureCapabilities {
        device: device.to_string(),
        device_present,
        opencv,
        gstreamer,
    }
}

#[cfg(feature = "opencv")]
fn probe_opencv() -> (Availability, Availability) {
    let gstreamer = match opencv::core::get_build_information() {
        Ok(info) if build_has_gstreamer(&info) => Availability::Available,
        Ok(_) => Availability::Missing("OpenCV built without GStreamer".into()),
        Err(e) => Availability::Missing(format!("OpenCV build info unavailable: {e}")),
    };
    (Availability::Available, gstreamer)
}

#[cfg(not(feature = "opencv"))]
fn probe_opencv() -> (Availability, Availability) {
    let reason = "opencv feature not enabled at compile time";
    (
        Availability::Missing(reason.into()),
        Availability::Missing(reason.into()),
    )
}

/// Looks for the `GStreamer: YES` line of OpenCV's build summary.
pub fn build_has_gstreamer(build_info: &str) -> bool {
    build_info.lines().any(|line| {
        let line = line.trim();
        line.strip_prefix("GStreamer:")
            .map(|rest| rest.trim_start().starts_with("YES"))
            .unwrap_or(false)
    })
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum V4l2ListError {
    #[error("v4l2-ctl not installed (install v4l-utils)")]
    NotInstalled,
    #[error("v4l2-ctl failed: {0}")]
    Failed(String),
    #[error("v4l2-ctl timed out")]
    TimedOut,
}

/// Output of `v4l2-ctl --list-devices`.
pub fn list_v4l2_devices() -> Result<String, V4l2ListError> {
    run_with_timeout("v4l2-ctl", &["--list-devices"], V4L2_CTL_TIMEOUT)
}

fn run_with_timeout(program: &str, args: &[&str], timeout: Duration) -> Result<String, V4l2ListError> {
    let mut child = Command::new(program)
        .args(args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => V4l2ListError::NotInstalled,
            _ => V4l2ListError::Failed(e.to_string()),
        })?;

    // Pipes are drained while the child runs so a full buffer cannot stall it.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let deadline = Instant::now() + timeout;
    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) if Instant::now() >= deadline => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(V4l2ListError::TimedOut);
            }
            Ok(None) => std::thread::sleep(Duration::from_millis(50)),
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(V4l2ListError::Failed(e.to_string()));
            }
        }
    };

    let stdout = stdout.map(collect).unwrap_or_default();
    if status.success() {
        Ok(stdout)
    } else {
        let stderr = stderr.map(collect).unwrap_or_default();
        Err(V4l2ListError::Failed(format!("{status}: {}", stderr.trim())))
    }
}

fn drain(mut pipe: impl Read + Send + 'static) -> JoinHandle<String> {
    std::thread::spawn(move || {
        let mut buf = String::new();
        let _ = pipe.read_to_string(&mut buf);
        buf
    })
}

fn collect(reader: JoinHandle<String>) -> String {
    reader.join().unwrap_or_default()
}
