use anyhow::Result;
use camera_session::probe::Availability;
use camera_session::{Backend, CameraConfig, CameraSession, Frame};
use scene_describe::{new_describer, probe_inference, select_kind, DescriberKind, SceneDescriber};
use std::process::ExitCode;
use std::sync::atomic::Ordering;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::camera;
use crate::config::VisionConfig;

const READ_RETRY_DELAY: Duration = Duration::from_millis(100);
const PACING: Duration = Duration::from_millis(30);

#[derive(Debug, Clone)]
pub struct VisionOptions {
    pub camera: CameraConfig,
    pub vision: VisionConfig,
    /// Force the heuristic describer.
    pub mock: bool,
}

pub fn run(opts: VisionOptions, mock_camera: bool) -> Result<ExitCode> {
    let VisionOptions {
        mut camera,
        mut vision,
        mock,
    } = opts;

    let inference = if mock {
        Availability::Missing("mock mode requested".into())
    } else {
        probe_inference(&vision.describer)
    };
    vision.describer.kind = select_kind(mock, &inference);
    if vision.describer.kind == DescriberKind::Heuristic {
        if let (false, Availability::Missing(reason)) = (mock, &inference) {
            println!("Inference endpoint unavailable ({reason}), using mock mode");
        }
        // the heuristic path runs off the plain V4L2 device
        camera.backend = Backend::Direct;
    }

    let mut describer = match new_describer(&vision.describer) {
        Ok(d) => d,
        Err(e) => {
            println!("Failed to load model {}: {e}", vision.describer.model);
            println!("Try mock mode with --mock");
            return Ok(ExitCode::FAILURE);
        }
    };
    match vision.describer.kind {
        DescriberKind::Heuristic => println!("Running in mock mode (basic scene analysis)"),
        DescriberKind::VlmHttp => println!("Model ready: {}", vision.describer.model),
    }

    let mut session = match camera::open_camera(camera, mock_camera) {
        Ok(session) => session,
        Err(_) => return Ok(ExitCode::FAILURE),
    };
    println!("Vision stream started. Press Ctrl+C to stop.");
    println!("Query interval: {}s", vision.interval_s);

    vision_loop(&mut session, describer.as_mut(), &vision, None);
    session.close();
    println!("\nStopped. Frames processed: {}", session.frame_count());
    Ok(ExitCode::SUCCESS)
}

/// Read continuously and describe one frame per interval. `max_queries`
/// bounds the run; `None` runs until Ctrl-C.
fn vision_loop(
    session: &mut CameraSession,
    describer: &mut dyn SceneDescriber,
    vision: &VisionConfig,
    max_queries: Option<u32>,
) -> u32 {
    let stop = camera::interrupt_flag();
    // negative or NaN queries every frame, infinite only once
    let interval = Duration::try_from_secs_f64(vision.interval_s).unwrap_or(
        if vision.interval_s > 0.0 {
            Duration::MAX
        } else {
            Duration::ZERO
        },
    );
    let mut last_query: Option<Instant> = None;
    let mut queries = 0u32;

    info!(describer = describer.name(), interval_s = vision.interval_s, "vision loop");
    while !stop.load(Ordering::SeqCst) {
        if max_queries.is_some_and(|max| queries >= max) {
            break;
        }
        let Some(frame) = read_frame(session) else {
            thread::sleep(READ_RETRY_DELAY);
            continue;
        };

        if last_query.map_or(true, |t| t.elapsed() >= interval) {
            println!("\n[Frame {}] Processing...", session.frame_count());
            match describer.describe(&frame, &vision.prompt) {
                Ok(text) => println!("Response: {text}"),
                Err(e) => {
                    warn!(error = %e, "describe failed");
                    println!("Error: {e}");
                }
            }
            last_query = Some(Instant::now());
            queries += 1;
        }
        thread::sleep(PACING);
    }
    queries
}

fn read_frame(session: &mut CameraSession) -> Option<Frame> {
    let frame = session.read();
    if frame.is_none() {
        debug!("no frame, retrying");
        println!("Failed to read frame");
    }
    frame
}
