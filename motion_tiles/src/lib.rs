// THEORY:
// This file is the entry point for the `motion_tiles` library crate. It exposes the
// `MotionPipeline` control loop together with the two capability traits a host
// application implements (`FrameSource`, `DisplaySink`) and the data it gets back
// (`FrameReport`, `Overlay`, `RunSummary`).
//
// The tile grid, the difference engine and the latency tracker live in
// `core_modules` and are public so they can be used on their own, but a typical
// host only touches the re-exports below. Capture and windowing backends live in
// separate crates; this one has no hardware dependencies.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod pipeline;

pub use crate::config::{CaptureSettings, MotionConfig};
pub use crate::core_modules::difference_engine::{DifferenceEngine, FlaggedTiles};
pub use crate::core_modules::latency::{Clock, FrameMetrics, LatencyTracker, SystemClock};
pub use crate::core_modules::overlay::{Label, Line, Outline, Overlay};
pub use crate::core_modules::threshold::{KeyAction, Threshold};
pub use crate::core_modules::tile_grid::{TileGrid, TileIndex, TileRect};
pub use crate::error::MotionError;
pub use crate::pipeline::{
    DisplaySink, FrameReport, FrameSource, LoopState, MotionPipeline, RunSummary,
    TerminationReason,
};
