// THEORY:
// Only startup can fail in a way the caller has to handle. Once the loop is
// running, a failed read is the end of the stream and a failed display ends the
// loop quietly, so neither shows up as an error from `MotionPipeline::run`.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MotionError {
    #[error("No camera frames from device {device}. Check the device index.")]
    NoInitialFrame { device: i32 },
    #[error("Frame of {width}x{height} cannot be split into a {grid_x}x{grid_y} tile grid")]
    InvalidGrid {
        width: u32,
        height: u32,
        grid_x: u32,
        grid_y: u32,
    },
    #[error("Invalid configuration value for {key}: {value:?}")]
    InvalidConfig { key: &'static str, value: String },
    #[error("Frame source error: {0}")]
    Source(String),
    #[error("Display error: {0}")]
    Display(String),
}
