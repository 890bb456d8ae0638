use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

mod camera;
mod config;
mod diagnostics;
mod display;
mod stream;
mod vision;

use config::{AppConfig, CameraArgs};

#[derive(Parser, Debug)]
#[command(
    name = "imx-cam",
    version,
    about = "IMX219 CSI camera streaming and scene description",
    disable_help_subcommand = true
)]
struct Cli {
    /// YAML config file; flags override its values
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Use the synthetic mock camera instead of hardware
    #[arg(long, action = ArgAction::SetTrue, global = true)]
    mock_camera: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Stream frames with optional preview and snapshots
    Stream {
        #[command(flatten)]
        camera: CameraArgs,
        /// Run without a preview window
        #[arg(long, action = ArgAction::SetTrue)]
        no_display: bool,
        /// Stop after this many seconds (0 runs until interrupted)
        #[arg(long, default_value_t = 0)]
        duration: u64,
        /// Save a snapshot every N frames
        #[arg(long)]
        snapshot_every: Option<u64>,
    },
    /// Describe the scene periodically with a vision-language model
    Vision {
        #[command(flatten)]
        camera: CameraArgs,
        /// Model name sent to the inference endpoint
        #[arg(long)]
        model: Option<String>,
        /// Inference endpoint base URL
        #[arg(long)]
        endpoint: Option<String>,
        /// Seconds between descriptions
        #[arg(long)]
        interval: Option<f64>,
        /// Prompt sent with each frame
        #[arg(long)]
        prompt: Option<String>,
        /// Maximum tokens per response
        #[arg(long)]
        max_tokens: Option<u32>,
        /// Use the heuristic describer instead of the model
        #[arg(long, action = ArgAction::SetTrue)]
        mock: bool,
    },
    /// Run camera diagnostics
    Check {
        /// Camera device path
        #[arg(long)]
        device: Option<String>,
        /// Print the summary as JSON
        #[arg(long, action = ArgAction::SetTrue)]
        json: bool,
    },
    /// Capture a few frames through the accelerated pipeline
    CaptureTest,
    /// Print brightness and edge statistics for a few frames
    Analyze {
        #[command(flatten)]
        camera: CameraArgs,
    },
}

fn main() -> ExitCode {
    setup_tracing();
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let app = AppConfig::load(cli.config.as_deref())?;
    let mock_camera = cli.mock_camera;
    match cli.command {
        Commands::Stream {
            camera,
            no_display,
            duration,
            snapshot_every,
        } => {
            let opts = stream::StreamOptions {
                camera: camera.apply(app.camera.clone()),
                display: !no_display,
                duration_s: duration,
                snapshot_every,
            };
            stream::run(opts, mock_camera)
        }
        Commands::Vision {
            camera,
            model,
            endpoint,
            interval,
            prompt,
            max_tokens,
            mock,
        } => {
            let mut vision = app.vision.clone();
            if let Some(model) = model {
                vision.describer.model = model;
            }
            if let Some(endpoint) = endpoint {
                vision.describer.endpoint = endpoint;
            }
            if let Some(max_tokens) = max_tokens {
                vision.describer.max_tokens = max_tokens;
            }
            if let Some(interval) = interval {
                vision.interval_s = interval;
            }
            if let Some(prompt) = prompt {
                vision.prompt = prompt;
            }
            let opts = vision::VisionOptions {
                camera: camera.apply(app.vision_camera()),
                vision,
                mock,
            };
            vision::run(opts, mock_camera)
        }
        Commands::Check { device, json } => {
            let device = device.unwrap_or_else(|| app.camera.device.clone());
            diagnostics::check(&device, json, mock_camera)
        }
        Commands::CaptureTest => diagnostics::capture_test(&app.camera.device, mock_camera),
        Commands::Analyze { camera } => {
            diagnostics::analyze(camera.apply(app.vision_camera()), mock_camera)
        }
    }
}

fn setup_tracing() {
    // Best-effort; default to info when RUST_LOG is unset
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use camera_session::Backend;

    #[test]
    fn test_parse_stream_flags() {
        let cli = Cli::parse_from([
            "imx-cam",
            "--mock-camera",
            "stream",
            "--no-gstreamer",
            "--no-display",
            "--duration",
            "5",
            "--snapshot-every",
            "10",
        ]);
        assert!(cli.mock_camera);
        match cli.command {
            Commands::Stream {
                camera,
                no_display,
                duration,
                snapshot_every,
            } => {
                assert!(no_display);
                assert_eq!(duration, 5);
                assert_eq!(snapshot_every, Some(10));
                let cfg = camera.apply(Default::default());
                assert_eq!(cfg.backend, Backend::Direct);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_backend_and_no_gstreamer_conflict() {
        let res = Cli::try_parse_from([
            "imx-cam",
            "stream",
            "--backend",
            "accelerated",
            "--no-gstreamer",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn test_parse_vision_flags() {
        let cli = Cli::parse_from([
            "imx-cam",
            "vision",
            "--mock",
            "--interval",
            "0.5",
            "--prompt",
            "Count the people.",
        ]);
        match cli.command {
            Commands::Vision {
                mock,
                interval,
                prompt,
                model,
                ..
            } => {
                assert!(mock);
                assert_eq!(interval, Some(0.5));
                assert_eq!(prompt.as_deref(), Some("Count the people."));
                assert!(model.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_mock_stream_runs_to_duration() {
        let cli = Cli::parse_from([
            "imx-cam",
            "--mock-camera",
            "stream",
            "--no-display",
            "--duration",
            "1",
        ]);
        assert!(run(cli).is_ok());
    }
}
