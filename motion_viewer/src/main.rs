mod camera;
mod display;

use anyhow::Context;
use camera::CameraSource;
use display::HighGuiDisplay;
use motion_tiles::{MotionConfig, MotionPipeline};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() -> anyhow::Result<()> {
    init_logging();

    // --- 1. Configuration ---
    let config = MotionConfig::from_env().context("reading MOTION_* configuration")?;

    // --- 2. Capture & Window Setup ---
    let device = config.camera_index;
    let source = CameraSource::open(device)
        .with_context(|| format!("opening capture device {device}"))?;
    let display = HighGuiDisplay::new();

    // --- 3. Startup (seed frame, tile grid) ---
    let pipeline = MotionPipeline::start(config, source, display).map_err(|e| {
        error!(error = %e, "startup failed");
        e
    })?;

    // --- 4. Main Loop ---
    info!("press +/- to change the threshold, ESC to quit");
    let summary = pipeline.run();

    println!(
        "Processed {} frames, final threshold {}",
        summary.frames_processed,
        summary.final_threshold.value()
    );
    Ok(())
}
