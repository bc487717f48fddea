//! follow_camd - person-following camera rig controller
//!
//! This daemon:
//! 1. Connects to the motor controller over serial
//! 2. Opens the camera
//! 3. Loads the person detector
//! 4. Steers the rig LEFT / RIGHT / STOP once per frame until the stream
//!    ends, `q` is pressed or Ctrl-C is received

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use follow_cam::ui::{Ui, UiMode};
use follow_cam::{
    build_backend, open_camera, open_display, open_sink, Follower, FollowerConfig,
};

#[derive(Parser, Debug)]
#[command(
    name = "follow_camd",
    version,
    about = "Keep a person centered by steering a motorized camera rig"
)]
struct Args {
    /// JSON config file
    #[arg(long, value_name = "PATH", env = "FOLLOW_CONFIG")]
    config: Option<PathBuf>,

    /// Camera device (e.g. /dev/video0, or stub://<name> for a synthetic scene)
    #[arg(long, value_name = "DEVICE")]
    camera: Option<String>,

    /// Serial port of the motor controller (or stub://<name> to only log commands)
    #[arg(long, value_name = "PORT")]
    port: Option<String>,

    /// ONNX model path
    #[arg(long, value_name = "PATH")]
    model: Option<PathBuf>,

    /// Detector backend (stub|tract)
    #[arg(long, value_name = "BACKEND")]
    detector: Option<String>,

    /// Run without a preview window
    #[arg(long)]
    headless: bool,

    /// Stop after this many frames
    #[arg(long, value_name = "N")]
    max_frames: Option<u64>,

    /// UI mode for stderr progress
    #[arg(long, value_enum, default_value_t = UiMode::Auto, value_name = "MODE")]
    ui: UiMode,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    let ui = Ui::detect(args.ui);
    let config = load_config(&args)?;

    let shutdown = Arc::new(AtomicBool::new(false));
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || {
            shutdown.store(true, Ordering::SeqCst);
        })
        .context("failed to install Ctrl-C handler")?;
    }

    let sink = {
        let stage = ui.stage("Connect motor controller");
        let sink = open_sink(&config.serial)?;
        stage.complete();
        sink
    };

    let source = {
        let stage = ui.stage("Open camera");
        let source = open_camera(&config.camera)?;
        stage.complete();
        source
    };

    let detector = {
        let stage = ui.stage("Load detector");
        let mut detector = build_backend(&config.detector)?;
        detector.warm_up().context("detector warm-up failed")?;
        stage.complete();
        detector
    };

    let display = {
        let stage = ui.stage("Open display");
        let display = open_display(&config.display, config.camera.width, config.camera.height)?;
        stage.complete();
        display
    };

    let mut follower = Follower::new(Box::new(source), detector, sink, display)
        .with_config(&config)
        .with_shutdown(shutdown);

    let summary = follower.run()?;
    log::info!(
        "follow_camd exiting: {:?}, {} frames, last command {}",
        summary.exit_reason,
        summary.frames,
        summary
            .last_command
            .map(|command| command.to_string())
            .unwrap_or_else(|| "none".to_string())
    );
    Ok(())
}

fn load_config(args: &Args) -> Result<FollowerConfig> {
    let mut config = FollowerConfig::load_from(args.config.as_deref())?;
    if let Some(camera) = &args.camera {
        config.camera.device = camera.clone();
    }
    if let Some(port) = &args.port {
        config.serial.port = port.clone();
    }
    if let Some(model) = &args.model {
        config.detector.model_path = model.clone();
    }
    if let Some(detector) = &args.detector {
        config.detector.backend = detector.clone();
    }
    if args.headless {
        config.display.enabled = false;
    }
    if args.max_frames.is_some() {
        config.run.max_frames = args.max_frames;
    }
    config.validate()?;
    Ok(config)
}
