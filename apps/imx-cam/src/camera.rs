use camera_session::{
    Backend, CameraConfig, CameraSession, CaptureProvider, Error, MockProvider, Result,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, OnceLock};

/// Mock provider when requested, otherwise the hardware provider if compiled in.
pub fn capture_provider(mock: bool) -> Result<Box<dyn CaptureProvider>> {
    if mock {
        tracing::info!("using mock capture provider");
        return Ok(Box::new(MockProvider::default()));
    }
    hardware_provider()
}

#[cfg(feature = "opencv")]
fn hardware_provider() -> Result<Box<dyn CaptureProvider>> {
    Ok(Box::new(camera_session::OpenCvProvider::new()))
}

#[cfg(not(feature = "opencv"))]
fn hardware_provider() -> Result<Box<dyn CaptureProvider>> {
    Err(Error::BackendUnavailable(
        "OpenCV capture not enabled at compile time; rebuild with --features opencv or pass --mock-camera",
    ))
}

/// Build and open a session, printing operator status along the way.
pub fn open_camera(config: CameraConfig, mock: bool) -> Result<CameraSession> {
    println!("Opening camera: {}", config.device);
    println!(
        "Resolution: {}x{} @ {}fps",
        config.width, config.height, config.framerate
    );
    match config.backend {
        Backend::Accelerated => println!("Using GStreamer pipeline (hardware accelerated)"),
        Backend::Direct => println!("Using V4L2 backend"),
    }

    let provider = match capture_provider(mock) {
        Ok(p) => p,
        Err(e) => {
            println!("❌ {e}");
            return Err(e);
        }
    };
    let mut session = CameraSession::new(config, provider);
    match session.try_open() {
        Ok(report) => {
            println!("✅ Camera opened successfully");
            println!(
                "   Actual resolution: {}x{}",
                report.negotiated.0, report.negotiated.1
            );
            Ok(session)
        }
        Err(e) => {
            match &e {
                Error::NoTrialFrame(_) => println!("❌ Failed to capture test frame"),
                _ => println!("❌ Failed to open camera"),
            }
            tracing::warn!(error = %e, "camera open failed");
            Err(e)
        }
    }
}

static INTERRUPTED: OnceLock<Arc<AtomicBool>> = OnceLock::new();

/// Flag set by Ctrl-C; loops poll it between frames. The handler is
/// installed on first use and the flag is cleared on every call.
pub fn interrupt_flag() -> Arc<AtomicBool> {
    let stop = INTERRUPTED.get_or_init(|| {
        let stop = Arc::new(AtomicBool::new(false));
        let flag = stop.clone();
        if let Err(e) = ctrlc::set_handler(move || flag.store(true, Ordering::SeqCst)) {
            tracing::warn!(error = %e, "Ctrl-C handler not installed");
        }
        stop
    });
    stop.store(false, Ordering::SeqCst);
    stop.clone()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_camera_opens() {
        let cfg = CameraConfig::new("/dev/video0", 320, 240, 30).with_backend(Backend::Direct);
        let mut session = open_camera(cfg, true).unwrap();
        assert!(session.is_open());
        assert_eq!(session.provider_name(), "mock");
        assert!(session.read().is_some());
        assert_eq!(session.frame_count(), 1);
    }

    #[cfg(not(feature = "opencv"))]
    #[test]
    fn test_hardware_unavailable_is_open_failure() {
        let err = open_camera(CameraConfig::default(), false).unwrap_err();
        assert!(matches!(err, Error::BackendUnavailable(_)));
        assert!(err.is_open_failure());
    }
}
