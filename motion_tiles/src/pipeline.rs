// THEORY:
// The `pipeline` module is the top-level API of the engine: the control loop that
// ties a frame source, the difference engine, the latency tracker and a display
// together. It is deliberately synchronous and single-threaded. The only blocking
// points are the frame read and a 1 ms key poll.
//
// Key architectural principles:
// 1.  **One Context Object**: Everything that survives between frames (threshold,
//     previous luminance frame, last capture timestamp, FPS average) lives in
//     `MotionPipeline`. There is no module-level state.
// 2.  **Capability Traits**: The camera and the window are reached only through
//     `FrameSource` and `DisplaySink`. The library never links a capture backend.
// 3.  **State Machine**: `Init -> Running -> Terminated`. Startup is the only place
//     an error is returned; afterwards a failed read ends the stream, a failed show
//     ends the loop, and `ESC` quits. All three release the source and windows.

use crate::config::{CaptureSettings, MotionConfig};
use crate::core_modules::difference_engine::{DifferenceEngine, FlaggedTiles};
use crate::core_modules::latency::{Clock, FrameMetrics, LatencyTracker, SystemClock, TimingSample};
use crate::core_modules::luma_frame::luma_frame::LumaFrame;
use crate::core_modules::overlay::Overlay;
use crate::core_modules::threshold::{KeyAction, Threshold};
use crate::core_modules::tile_grid::TileGrid;
use crate::error::MotionError;
use image::RgbImage;
use tracing::{debug, info, warn};

/// Key poll timeout per cycle, in milliseconds.
pub const KEY_POLL_TIMEOUT_MS: u32 = 1;
const METRICS_LOG_INTERVAL: u64 = 120;

/// A supplier of sequential color frames.
pub trait FrameSource {
    /// Requests capture parameters. Advisory: a source may ignore any of them.
    fn configure(&mut self, settings: &CaptureSettings);
    /// The next frame, or `None` once the stream has ended or the device failed.
    fn read(&mut self) -> Option<RgbImage>;
    /// Releases the underlying device.
    fn release(&mut self) {}
}

/// A window that shows annotated frames and reports key presses.
pub trait DisplaySink {
    /// Draws `overlay` on `frame` and shows it in `window_name`.
    fn show(&mut self, window_name: &str, frame: RgbImage, overlay: &Overlay)
    -> Result<(), MotionError>;
    /// Waits at most `timeout_ms` for a key press.
    fn poll_key(&mut self, timeout_ms: u32) -> Option<i32>;
    fn destroy_all_windows(&mut self);
}

impl<T: FrameSource + ?Sized> FrameSource for &mut T {
    fn configure(&mut self, settings: &CaptureSettings) {
        (**self).configure(settings)
    }

    fn read(&mut self) -> Option<RgbImage> {
        (**self).read()
    }

    fn release(&mut self) {
        (**self).release()
    }
}

impl<T: DisplaySink + ?Sized> DisplaySink for &mut T {
    fn show(
        &mut self,
        window_name: &str,
        frame: RgbImage,
        overlay: &Overlay,
    ) -> Result<(), MotionError> {
        (**self).show(window_name, frame, overlay)
    }

    fn poll_key(&mut self, timeout_ms: u32) -> Option<i32> {
        (**self).poll_key(timeout_ms)
    }

    fn destroy_all_windows(&mut self) {
        (**self).destroy_all_windows()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Init,
    Running,
    Terminated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    EndOfStream,
    UserQuit,
    DisplayFailed,
}

/// The result of one processed frame.
#[derive(Debug, Clone)]
pub struct FrameReport {
    /// 1-based count of processed frames. The seed frame read at startup is not counted.
    pub frame_number: u64,
    pub flagged: FlaggedTiles,
    pub metrics: FrameMetrics,
    /// The threshold the frame was compared with.
    pub threshold: Threshold,
    pub key_action: KeyAction,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub frames_processed: u64,
    pub final_threshold: Threshold,
    pub smoothed_fps: Option<f64>,
    pub reason: Option<TerminationReason>,
}

/// The control loop and all of its cross-frame state.
pub struct MotionPipeline<S: FrameSource, D: DisplaySink, C: Clock = SystemClock> {
    config: MotionConfig,
    source: S,
    display: D,
    clock: C,
    engine: DifferenceEngine,
    threshold: Threshold,
    previous: LumaFrame,
    tracker: LatencyTracker,
    state: LoopState,
    frames_processed: u64,
    termination: Option<TerminationReason>,
}

impl<S: FrameSource, D: DisplaySink> MotionPipeline<S, D, SystemClock> {
    pub fn start(config: MotionConfig, source: S, display: D) -> Result<Self, MotionError> {
        Self::start_with_clock(config, source, display, SystemClock)
    }
}

impl<S: FrameSource, D: DisplaySink, C: Clock> MotionPipeline<S, D, C> {
    /// Runs the `Init` state: configures the source, reads the seed frame and builds
    /// the tile grid from its dimensions.
    pub fn start_with_clock(
        config: MotionConfig,
        mut source: S,
        mut display: D,
        clock: C,
    ) -> Result<Self, MotionError> {
        source.configure(&config.capture);

        let Some(seed) = source.read() else {
            source.release();
            display.destroy_all_windows();
            return Err(MotionError::NoInitialFrame {
                device: config.camera_index,
            });
        };
        let previous = LumaFrame::from_rgb(&seed);
        let (width, height) = previous.dimensions();

        let grid = match TileGrid::new(width, height, config.grid_x, config.grid_y) {
            Ok(grid) => grid,
            Err(e) => {
                source.release();
                display.destroy_all_windows();
                return Err(e);
            }
        };
        let engine = DifferenceEngine::new(grid).with_parallelism(config.parallel);
        let (tile_width, tile_height) = engine.grid().tile_dimensions();
        info!(
            device = config.camera_index,
            width,
            height,
            grid_x = config.grid_x,
            grid_y = config.grid_y,
            tile_width,
            tile_height,
            threshold = config.threshold,
            workers = engine.workers(),
            "motion pipeline started"
        );

        Ok(Self {
            threshold: Threshold::new(config.threshold),
            config,
            source,
            display,
            clock,
            engine,
            previous,
            tracker: LatencyTracker::new(),
            state: LoopState::Running,
            frames_processed: 0,
            termination: None,
        })
    }

    /// Runs one `Running` cycle. Returns `None` if the loop is no longer running or
    /// the source has ended.
    pub fn step(&mut self) -> Option<FrameReport> {
        if self.state != LoopState::Running {
            return None;
        }

        let capture = self.clock.now();
        let Some(frame) = self.source.read() else {
            self.terminate(TerminationReason::EndOfStream);
            return None;
        };

        let processing_start = self.clock.now();
        let current = LumaFrame::from_rgb(&frame);
        let threshold = self.threshold;
        let flagged = self.engine.detect(&current, &self.previous, threshold);
        let processing_end = self.clock.now();

        let display = self.clock.now();
        let metrics = self.tracker.observe(&TimingSample {
            capture,
            processing_start,
            processing_end,
            display,
        });
        let overlay = Overlay::build(self.engine.grid(), &flagged, &metrics);

        let key_action = match self.display.show(&self.config.window_name, frame, &overlay) {
            Ok(()) => self
                .display
                .poll_key(KEY_POLL_TIMEOUT_MS)
                .map(KeyAction::from_key_code)
                .unwrap_or(KeyAction::Ignore),
            Err(e) => {
                warn!(error = %e, "display failed, stopping");
                self.terminate(TerminationReason::DisplayFailed);
                KeyAction::Ignore
            }
        };
        self.apply(key_action);

        self.previous = current;
        self.frames_processed += 1;

        if self.frames_processed % METRICS_LOG_INTERVAL == 0 {
            debug!(
                frame = self.frames_processed,
                flagged = flagged.len(),
                processing_ms = metrics.processing_latency_ms,
                frame_time_ms = metrics.delivered_frame_time_ms,
                total_latency_ms = metrics.estimated_total_latency_ms,
                fps = metrics.fps_smoothed,
                "frame metrics"
            );
        }

        Some(FrameReport {
            frame_number: self.frames_processed,
            flagged,
            metrics,
            threshold,
            key_action,
        })
    }

    /// Cycles until the loop terminates, then releases the source and windows.
    pub fn run(mut self) -> RunSummary {
        while self.state == LoopState::Running {
            self.step();
        }
        self.shutdown()
    }

    /// Enters `Terminated` (if not already there) and releases resources.
    pub fn shutdown(mut self) -> RunSummary {
        self.state = LoopState::Terminated;
        self.source.release();
        self.display.destroy_all_windows();
        let summary = RunSummary {
            frames_processed: self.frames_processed,
            final_threshold: self.threshold,
            smoothed_fps: self.tracker.smoothed_fps(),
            reason: self.termination,
        };
        info!(
            frames = summary.frames_processed,
            threshold = summary.final_threshold.value(),
            fps = summary.smoothed_fps.unwrap_or(0.0),
            reason = ?summary.reason,
            "motion pipeline stopped"
        );
        summary
    }

    fn apply(&mut self, action: KeyAction) {
        match action {
            KeyAction::Quit => self.terminate(TerminationReason::UserQuit),
            KeyAction::RaiseThreshold => {
                self.threshold.raise();
                info!(threshold = self.threshold.value(), "threshold raised");
            }
            KeyAction::LowerThreshold => {
                self.threshold.lower();
                info!(threshold = self.threshold.value(), "threshold lowered");
            }
            KeyAction::Ignore => {}
        }
    }

    fn terminate(&mut self, reason: TerminationReason) {
        if self.state != LoopState::Terminated {
            debug!(?reason, "loop terminating");
            self.state = LoopState::Terminated;
            self.termination = Some(reason);
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    pub fn threshold(&self) -> Threshold {
        self.threshold
    }

    pub fn grid(&self) -> &TileGrid {
        self.engine.grid()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    pub fn termination(&self) -> Option<TerminationReason> {
        self.termination
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn display(&self) -> &D {
        &self.display
    }
}
