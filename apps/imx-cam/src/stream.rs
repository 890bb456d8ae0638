use anyhow::Result;
use camera_session::{io, CameraConfig, CameraSession, Frame};
use std::io::Write;
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use crate::camera;
use crate::display::{KeyAction, Preview};

const STATUS_EVERY: u64 = 30;

#[derive(Debug, Clone)]
pub struct StreamOptions {
    pub camera: CameraConfig,
    pub display: bool,
    /// Zero runs until interrupted.
    pub duration_s: u64,
    pub snapshot_every: Option<u64>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct StreamStats {
    pub frames: u64,
    pub fps: f64,
    pub snapshots: u32,
}

pub fn run(opts: StreamOptions, mock_camera: bool) -> Result<ExitCode> {
    let mut session = match camera::open_camera(opts.camera.clone(), mock_camera) {
        Ok(session) => session,
        Err(_) => return Ok(ExitCode::FAILURE),
    };

    let stats = stream_loop(&mut session, &opts);
    session.close();

    println!();
    println!("Stream statistics:");
    println!("  Total frames: {}", stats.frames);
    println!("  Average FPS: {:.1}", stats.fps);
    println!("  Snapshots saved: {}", stats.snapshots);
    Ok(ExitCode::SUCCESS)
}

fn stream_loop(session: &mut CameraSession, opts: &StreamOptions) -> StreamStats {
    let mut preview = if opts.display {
        match Preview::new("IMX219 Camera") {
            Ok(p) => {
                println!("Press 'q' to quit, 's' to save snapshot");
                Some(p)
            }
            Err(e) => {
                warn!(error = %e, "preview unavailable, running headless");
                None
            }
        }
    } else {
        None
    };
    let viewer = preview.as_mut().map(|p| p as &mut dyn Viewer);
    stream_frames(session, opts, viewer)
}

/// Frame sink for the stream loop; `Preview` in the binary.
trait Viewer {
    fn show(&mut self, frame: &Frame, fps: f64) -> Result<Option<KeyAction>>;
}

impl Viewer for Preview {
    fn show(&mut self, frame: &Frame, fps: f64) -> Result<Option<KeyAction>> {
        Preview::show(self, frame, fps)
    }
}

/// Runs until read failure, deadline, Ctrl-C or quit. Every exit path
/// returns the statistics gathered so far.
fn stream_frames(
    session: &mut CameraSession,
    opts: &StreamOptions,
    mut preview: Option<&mut dyn Viewer>,
) -> StreamStats {
    let stop = camera::interrupt_flag();
    // an unrepresentable deadline means no deadline
    let deadline = (opts.duration_s > 0)
        .then(|| Instant::now().checked_add(Duration::from_secs(opts.duration_s)))
        .flatten();
    let mut stats = StreamStats::default();

    info!(display = preview.is_some(), duration_s = opts.duration_s, "streaming");
    loop {
        if stop.load(Ordering::SeqCst) {
            println!("\nInterrupted");
            break;
        }
        let Some(frame) = session.read() else {
            println!("Failed to read frame");
            break;
        };
        let count = session.frame_count();
        let fps = session.fps();

        let mut snapshot = opts
            .snapshot_every
            .is_some_and(|n| n > 0 && count % n == 0);
        if let Some(preview) = preview.as_mut() {
            match preview.show(&frame, fps) {
                Ok(Some(KeyAction::Quit)) => break,
                Ok(Some(KeyAction::Snapshot)) => snapshot = true,
                Ok(None) => {}
                Err(e) => {
                    warn!(error = %e, "preview failed");
                    println!("\nPreview error: {e}");
                    break;
                }
            }
        }
        if snapshot {
            save_snapshot(&frame, &mut stats);
        }

        if count % STATUS_EVERY == 0 {
            print!("\rFrames: {count} | FPS: {fps:.1}");
            let _ = std::io::stdout().flush();
        }
        if deadline.is_some_and(|d| Instant::now() >= d) {
            println!("\nDuration reached");
            break;
        }
    }

    stats.frames = session.frame_count();
    stats.fps = session.fps();
    stats
}

fn save_snapshot(frame: &Frame, stats: &mut StreamStats) {
    let name = io::snapshot_name(stats.snapshots + 1);
    match io::write_image(&name, frame) {
        Ok(()) => {
            stats.snapshots += 1;
            println!("\nSaved: {name}");
        }
        Err(e) => warn!(error = %e, file = %name, "snapshot failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_session::{Backend, MockBehavior, MockProvider};

    fn mock_session(behavior: MockBehavior) -> CameraSession {
        let cfg = CameraConfig::new("/dev/video0", 64, 48, 30).with_backend(Backend::Direct);
        let mut session = CameraSession::new(cfg, Box::new(MockProvider::new(behavior)));
        assert!(session.open());
        session
    }

    #[test]
    fn test_loop_stops_on_read_failure() {
        let mut session = mock_session(MockBehavior {
            fail_reads_after: Some(11),
            ..Default::default()
        });
        let opts = StreamOptions {
            camera: session.config().clone(),
            display: false,
            duration_s: 0,
            snapshot_every: None,
        };
        let stats = stream_loop(&mut session, &opts);
        // trial frame plus ten counted reads
        assert_eq!(stats.frames, 10);
        assert_eq!(stats.snapshots, 0);
        assert!(session.is_open());
    }

    #[test]
    fn test_huge_duration_means_no_deadline() {
        let mut session = mock_session(MockBehavior {
            fail_reads_after: Some(4),
            ..Default::default()
        });
        let opts = StreamOptions {
            camera: session.config().clone(),
            display: false,
            duration_s: u64::MAX,
            snapshot_every: None,
        };
        let stats = stream_loop(&mut session, &opts);
        assert_eq!(stats.frames, 3);
    }

    struct BrokenWindow {
        shown: u32,
        fail_on: u32,
    }

    impl Viewer for BrokenWindow {
        fn show(&mut self, _frame: &Frame, _fps: f64) -> Result<Option<KeyAction>> {
            self.shown += 1;
            if self.shown == self.fail_on {
                anyhow::bail!("display connection lost");
            }
            Ok(None)
        }
    }

    #[test]
    fn test_preview_error_ends_loop_with_stats() {
        let mut session = mock_session(MockBehavior::default());
        let opts = StreamOptions {
            camera: session.config().clone(),
            display: true,
            duration_s: 0,
            snapshot_every: None,
        };
        let mut window = BrokenWindow {
            shown: 0,
            fail_on: 5,
        };
        let stats = stream_frames(&mut session, &opts, Some(&mut window));
        assert_eq!(window.shown, 5);
        assert_eq!(stats.frames, 5);
        assert!(session.is_open());
    }

    struct QuitAfter(u32);

    impl Viewer for QuitAfter {
        fn show(&mut self, _frame: &Frame, _fps: f64) -> Result<Option<KeyAction>> {
            self.0 = self.0.saturating_sub(1);
            Ok((self.0 == 0).then_some(KeyAction::Quit))
        }
    }

    #[test]
    fn test_quit_key_stops_stream() {
        let mut session = mock_session(MockBehavior::default());
        let opts = StreamOptions {
            camera: session.config().clone(),
            display: true,
            duration_s: 0,
            snapshot_every: None,
        };
        let stats = stream_frames(&mut session, &opts, Some(&mut QuitAfter(2)));
        assert_eq!(stats.frames, 2);
    }
}
