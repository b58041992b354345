// THEORY:
// `MotionConfig` is the single bundle of startup constants for the engine. The
// defaults describe a 1280x720 capture at 60 fps split into a 16x16 grid, with an
// initial brightness threshold of 15. Every value can be overridden from the
// environment so a deployment can point at another capture device without a
// rebuild; nothing is read from files and there are no CLI flags.

use crate::error::MotionError;
use std::str::FromStr;

pub const DEFAULT_GRID_X: u32 = 16;
pub const DEFAULT_GRID_Y: u32 = 16;
pub const DEFAULT_THRESHOLD: u8 = 15;
pub const DEFAULT_CAMERA_INDEX: i32 = 0;
pub const DEFAULT_WINDOW_NAME: &str = "Motion Tiles";

/// Capture parameters requested from the frame source. Advisory only: a source is
/// free to ignore any of them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CaptureSettings {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    /// Number of frames the driver may queue. 1 keeps the displayed frame fresh.
    pub buffer_size: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
            fps: 60.0,
            buffer_size: 1,
        }
    }
}

/// Configuration for the MotionPipeline.
#[derive(Debug, Clone)]
pub struct MotionConfig {
    /// Tiles across.
    pub grid_x: u32,
    /// Tiles down.
    pub grid_y: u32,
    /// Initial brightness delta threshold (0..=255). Mutable at runtime via the keyboard.
    pub threshold: u8,
    pub camera_index: i32,
    pub capture: CaptureSettings,
    pub window_name: String,
    /// Compute tile means on scoped worker threads instead of inline.
    pub parallel: bool,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            grid_x: DEFAULT_GRID_X,
            grid_y: DEFAULT_GRID_Y,
            threshold: DEFAULT_THRESHOLD,
            camera_index: DEFAULT_CAMERA_INDEX,
            capture: CaptureSettings::default(),
            window_name: DEFAULT_WINDOW_NAME.to_string(),
            parallel: false,
        }
    }
}

impl MotionConfig {
    /// Defaults with any `MOTION_*` environment overrides applied.
    pub fn from_env() -> Result<Self, MotionError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Applies overrides from an arbitrary key lookup. `from_env` passes the process
    /// environment; tests pass a map.
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, MotionError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = parse_var(&lookup, "MOTION_CAM")? {
            self.camera_index = v;
        }
        if let Some(v) = parse_var(&lookup, "MOTION_GRID_X")? {
            self.grid_x = v;
        }
        if let Some(v) = parse_var(&lookup, "MOTION_GRID_Y")? {
            self.grid_y = v;
        }
        if let Some(v) = parse_var(&lookup, "MOTION_THRESHOLD")? {
            self.threshold = v;
        }
        if let Some(v) = parse_var(&lookup, "MOTION_WIDTH")? {
            self.capture.width = v;
        }
        if let Some(v) = parse_var(&lookup, "MOTION_HEIGHT")? {
            self.capture.height = v;
        }
        if let Some(v) = parse_var(&lookup, "MOTION_FPS")? {
            self.capture.fps = v;
        }
        if let Some(v) = parse_var(&lookup, "MOTION_PARALLEL")? {
            self.parallel = v;
        }

        if self.grid_x == 0 {
            return Err(MotionError::InvalidConfig {
                key: "MOTION_GRID_X",
                value: self.grid_x.to_string(),
            });
        }
        if self.grid_y == 0 {
            return Err(MotionError::InvalidConfig {
                key: "MOTION_GRID_Y",
                value: self.grid_y.to_string(),
            });
        }
        Ok(self)
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, MotionError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| MotionError::InvalidConfig { key, value: raw }),
    }
}
