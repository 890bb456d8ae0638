use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use crate::pipeline::PipelineBuilder;
use crate::{
    Backend, CameraConfig, CaptureHandle, CaptureProvider, CaptureTarget, Error, Frame, Result,
};

/// Outcome of a successful open.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OpenReport {
    pub backend: Backend,
    pub provider: &'static str,
    pub target: CaptureTarget,
    /// Geometry of the trial frame (or as reported by the driver).
    pub negotiated: (u32, u32),
}

/// Lifecycle owner of one capture handle.
///
/// Single-threaded: every call blocks the caller until the provider
/// answers. Concurrent use must be serialised by the caller.
pub struct CameraSession {
    config: CameraConfig,
    provider: Box<dyn CaptureProvider>,
    handle: Option<Box<dyn CaptureHandle>>,
    frame_count: u64,
    started_at: Option<Instant>,
}

impl CameraSession {
    /// Build a closed session. Performs no I/O.
    pub fn new(config: CameraConfig, provider: Box<dyn CaptureProvider>) -> Self {
        Self {
            config,
            provider,
            handle: None,
            frame_count: 0,
            started_at: None,
        }
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }

    pub fn backend(&self) -> Backend {
        self.config.backend
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Frames read since the last successful open. The trial frame is not counted.
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Wall-clock time since the last successful open.
    pub fn elapsed(&self) -> Option<Duration> {
        self.started_at.map(|t| t.elapsed())
    }

    /// Acquisition target for the configured backend.
    pub fn target(&self) -> CaptureTarget {
        match self.config.backend {
            Backend::Accelerated => {
                CaptureTarget::Pipeline(PipelineBuilder::from_config(&self.config).build())
            }
            Backend::Direct => CaptureTarget::Device {
                path: self.config.device.clone(),
                width: self.config.width,
                height: self.config.height,
                framerate: self.config.framerate,
            },
        }
    }

    /// Open and validate with one trial frame, reporting the cause on failure.
    ///
    /// An already-open handle is released first. If the trial read fails the
    /// fresh handle is released before returning, so the session stays closed.
    pub fn try_open(&mut self) -> Result<OpenReport> {
        self.release_handle();
        self.config.validate()?;

        let target = self.target();
        info!(
            device = %self.config.device,
            width = self.config.width,
            height = self.config.height,
            framerate = self.config.framerate,
            backend = %self.config.backend,
            provider = self.provider.name(),
            "opening camera"
        );
        debug!(%target, "capture target");

        let mut handle = self.provider.open(&target)?;
        let trial = match handle.read() {
            Ok(frame) => frame,
            Err(e) => {
                handle.release();
                return Err(Error::NoTrialFrame(e.to_string()));
            }
        };
        let negotiated = handle
            .negotiated()
            .unwrap_or((trial.width, trial.height));

        self.handle = Some(handle);
        self.frame_count = 0;
        self.started_at = Some(Instant::now());

        info!(
            width = negotiated.0,
            height = negotiated.1,
            "camera opened"
        );
        if negotiated != (self.config.width, self.config.height) {
            warn!(
                requested_width = self.config.width,
                requested_height = self.config.height,
                actual_width = negotiated.0,
                actual_height = negotiated.1,
                "driver negotiated a different geometry"
            );
        }

        Ok(OpenReport {
            backend: self.config.backend,
            provider: self.provider.name(),
            target,
            negotiated,
        })
    }

    /// Open the session. `false` means the attempt failed and the session is closed.
    pub fn open(&mut self) -> bool {
        match self.try_open() {
            Ok(_) => true,
            Err(e) => {
                let expected = e.is_open_failure();
                if expected {
                    warn!(
                        device = %self.config.device,
                        width = self.config.width,
                        height = self.config.height,
                        error = %e,
                        "failed to open camera"
                    );
                } else {
                    error!(
                        device = %self.config.device,
                        width = self.config.width,
                        height = self.config.height,
                        error = %e,
                        "unexpected backend fault while opening camera"
                    );
                }
                false
            }
        }
    }

    /// Pull one frame, reporting why none was produced.
    pub fn try_read(&mut self) -> Result<Frame> {
        let handle = self.handle.as_mut().ok_or(Error::NotOpen)?;
        let frame = handle.read()?;
        self.frame_count += 1;
        Ok(frame)
    }

    /// Pull one frame. `None` when closed or when the backend has no frame;
    /// no retry is attempted.
    pub fn read(&mut self) -> Option<Frame> {
        match self.try_read() {
            Ok(frame) => Some(frame),
            Err(Error::NotOpen) => None,
            Err(e) => {
                debug!(error = %e, "frame read failed");
                None
            }
        }
    }

    /// Running average frames per second since open.
    pub fn fps(&self) -> f64 {
        let Some(started) = self.started_at else {
            return 0.0;
        };
        if self.frame_count == 0 {
            return 0.0;
        }
        let elapsed = started.elapsed().as_secs_f64();
        if elapsed > 0.0 {
            self.frame_count as f64 / elapsed
        } else {
            0.0
        }
    }

    /// Release the handle if present. Safe to call repeatedly.
    pub fn close(&mut self) {
        if self.release_handle() {
            info!(device = %self.config.device, frames = self.frame_count, "camera closed");
        }
    }

    fn release_handle(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.release();
                true
            }
            None => false,
        }
    }
}

impl fmt::Debug for CameraSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CameraSession")
            .field("config", &self.config)
            .field("provider", &self.provider.name())
            .field("open", &self.is_open())
            .field("frame_count", &self.frame_count)
            .finish()
    }
}

impl Drop for CameraSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(all(test, feature = "mock"))]
mod tests {
    use super::*;
    use crate::{MockBehavior, MockProvider};

    fn direct_config() -> CameraConfig {
        CameraConfig::new("/dev/video0", 640, 480, 30).with_backend(Backend::Direct)
    }

    fn session_with(behavior: MockBehavior) -> (CameraSession, crate::MockStats) {
        let provider = MockProvider::new(behavior);
        let stats = provider.stats();
        (
            CameraSession::new(direct_config(), Box::new(provider)),
            stats,
        )
    }

    #[test]
    fn test_construction_performs_no_io() {
        let (session, stats) = session_with(MockBehavior::default());
        assert!(!session.is_open());
        assert_eq!(stats.opens(), 0);
        assert_eq!(stats.reads(), 0);
        assert_eq!(session.fps(), 0.0);
    }

    #[test]
    fn test_debug_output() {
        let (mut session, _stats) = session_with(MockBehavior::default());
        assert!(session.open());
        session.read();
        let text = format!("{session:?}");
        assert!(text.contains("provider: \"mock\""), "{text}");
        assert!(text.contains("open: true"), "{text}");
        assert!(text.contains("frame_count: 1"), "{text}");
    }

    #[test]
    fn test_direct_scenario() {
        let (mut session, stats) = session_with(MockBehavior::default());
        assert!(session.open());
        for _ in 0..3 {
            let frame = session.read().unwrap();
            assert_eq!((frame.width, frame.height), (640, 480));
        }
        assert_eq!(session.frame_count(), 3);
        // trial frame plus three reads
        assert_eq!(stats.reads(), 4);

        session.close();
        assert!(session.read().is_none());
        assert!(matches!(session.try_read(), Err(Error::NotOpen)));
        // reads on a closed session touch neither the counter nor the provider
        assert_eq!(session.frame_count(), 3);
        assert_eq!(stats.reads(), 4);
        assert_eq!(stats.releases(), 1);
        assert_eq!(
            stats.last_target(),
            Some(CaptureTarget::Device {
                path: "/dev/video0".into(),
                width: 640,
                height: 480,
                framerate: 30,
            })
        );
    }

    #[test]
    fn test_open_failure_scenario() {
        let (mut session, stats) = session_with(MockBehavior {
            fail_open: true,
            ..MockBehavior::default()
        });
        assert!(!session.open());
        assert!(!session.is_open());
        assert_eq!(session.frame_count(), 0);
        assert_eq!(session.fps(), 0.0);
        assert_eq!(stats.releases(), 0);
    }

    #[test]
    fn test_open_then_close_reports_zero() {
        let (mut session, _) = session_with(MockBehavior::default());
        assert!(session.open());
        session.close();
        assert_eq!(session.frame_count(), 0);
        assert_eq!(session.fps(), 0.0);
    }

    #[test]
    fn test_frame_count_matches_reads() {
        for n in [0u64, 1, 7, 31] {
            let (mut session, _) = session_with(MockBehavior::default());
            assert!(session.open());
            for _ in 0..n {
                assert!(session.read().is_some());
            }
            assert_eq!(session.frame_count(), n);
        }
    }

    #[test]
    fn test_close_is_idempotent() {
        let (mut session, stats) = session_with(MockBehavior::default());
        assert!(session.open());
        session.close();
        session.close();
        assert!(!session.is_open());
        assert_eq!(stats.releases(), 1);

        // never opened
        let (mut closed, closed_stats) = session_with(MockBehavior::default());
        closed.close();
        closed.close();
        assert_eq!(closed_stats.releases(), 0);
    }

    #[test]
    fn test_read_when_closed_has_no_side_effects() {
        let (mut session, stats) = session_with(MockBehavior::default());
        assert!(session.read().is_none());
        assert!(matches!(session.try_read(), Err(Error::NotOpen)));
        assert_eq!(session.frame_count(), 0);
        assert_eq!(stats.reads(), 0);
    }

    #[test]
    fn test_trial_read_failure_releases_handle() {
        let (mut session, stats) = session_with(MockBehavior {
            fail_trial_read: true,
            ..MockBehavior::default()
        });
        let err = session.try_open().unwrap_err();
        assert!(matches!(err, Error::NoTrialFrame(_)));
        assert!(err.is_open_failure());
        assert!(!session.is_open());
        assert_eq!(stats.opens(), 1);
        assert_eq!(stats.releases(), 1);

        // no double release
        session.close();
        assert_eq!(stats.releases(), 1);
    }

    #[test]
    fn test_read_failure_leaves_state() {
        let (mut session, _) = session_with(MockBehavior {
            fail_reads_after: Some(2),
            ..MockBehavior::default()
        });
        assert!(session.open());
        assert!(session.read().is_some());
        assert!(session.read().is_none());
        assert!(matches!(session.try_read(), Err(Error::ReadFailure(_))));
        assert!(session.is_open());
        assert_eq!(session.frame_count(), 1);
    }

    #[test]
    fn test_reopen_resets_frame_count() {
        let (mut session, stats) = session_with(MockBehavior::default());
        assert!(session.open());
        session.read();
        session.read();
        assert_eq!(session.frame_count(), 2);

        assert!(session.open());
        assert_eq!(session.frame_count(), 0);
        assert_eq!(stats.opens(), 2);
        assert_eq!(stats.releases(), 1);
    }

    #[test]
    fn test_fps_running_average() {
        let (mut session, _) = session_with(MockBehavior::default());
        assert!(session.open());
        for _ in 0..5 {
            session.read();
        }
        std::thread::sleep(Duration::from_millis(20));
        let fps = session.fps();
        assert!(fps > 0.0);
        assert!(fps.is_finite());
        // 5 frames over at least 20ms
        assert!(fps <= 250.0);
    }

    #[test]
    fn test_accelerated_target_is_pipeline() {
        let provider = MockProvider::default();
        let stats = provider.stats();
        let mut session = CameraSession::new(
            CameraConfig::new("/dev/video0", 1280, 720, 30),
            Box::new(provider),
        );
        let report = session.try_open().unwrap();
        assert_eq!(report.backend, Backend::Accelerated);
        assert_eq!(report.negotiated, (1280, 720));
        match stats.last_target() {
            Some(CaptureTarget::Pipeline(desc)) => {
                assert!(desc.starts_with("nvarguscamerasrc sensor-id=0"));
                assert!(desc.ends_with("appsink max-buffers=1 drop=true sync=false"));
            }
            other => panic!("unexpected target: {other:?}"),
        }
    }

    #[test]
    fn test_negotiated_geometry_reported() {
        let (mut session, _) = session_with(MockBehavior {
            negotiated: Some((320, 240)),
            ..MockBehavior::default()
        });
        let report = session.try_open().unwrap();
        assert_eq!(report.negotiated, (320, 240));
    }

    #[test]
    fn test_invalid_config_fails_open_without_io() {
        let provider = MockProvider::default();
        let stats = provider.stats();
        let mut session = CameraSession::new(
            CameraConfig::new("/dev/video0", 0, 480, 30),
            Box::new(provider),
        );
        assert!(!session.open());
        assert_eq!(stats.opens(), 0);
    }

    #[test]
    fn test_drop_releases_handle() {
        let (mut session, stats) = session_with(MockBehavior::default());
        assert!(session.open());
        drop(session);
        assert_eq!(stats.releases(), 1);
    }
}
