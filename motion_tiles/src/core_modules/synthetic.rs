// THEORY:
// Deterministic stand-ins for the camera and the window. `SyntheticSource` replays a
// fixed list of frames and can advance a `ManualClock` by a fixed delivery interval
// on every read, which is how a camera blocking until the next frame looks to the
// loop. `RecordingDisplay` keeps everything it is asked to show and answers key
// polls from a script. Together they let the whole control loop run without
// hardware.

use crate::config::CaptureSettings;
use crate::core_modules::latency::ManualClock;
use crate::core_modules::overlay::Overlay;
use crate::error::MotionError;
use crate::pipeline::{DisplaySink, FrameSource};
use image::{Rgb, RgbImage};
use std::collections::VecDeque;
use std::time::Duration;

/// Replays a fixed sequence of frames, then reports end of stream.
#[derive(Debug, Default)]
pub struct SyntheticSource {
    frames: VecDeque<RgbImage>,
    clock: Option<(ManualClock, Duration)>,
    settings: Option<CaptureSettings>,
    reads: usize,
    released: bool,
}

impl SyntheticSource {
    pub fn new(frames: impl IntoIterator<Item = RgbImage>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            ..Self::default()
        }
    }

    /// `count` identical frames filled with one gray level.
    pub fn uniform(width: u32, height: u32, gray: u8, count: usize) -> Self {
        let frame = RgbImage::from_pixel(width, height, Rgb([gray, gray, gray]));
        Self::new(std::iter::repeat_n(frame, count))
    }

    /// Every read advances `clock` by `interval` before returning.
    pub fn with_clock(mut self, clock: ManualClock, interval: Duration) -> Self {
        self.clock = Some((clock, interval));
        self
    }

    pub fn settings(&self) -> Option<&CaptureSettings> {
        self.settings.as_ref()
    }

    /// Number of read calls, including the one that found the stream empty.
    pub fn reads(&self) -> usize {
        self.reads
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn is_released(&self) -> bool {
        self.released
    }
}

impl FrameSource for SyntheticSource {
    fn configure(&mut self, settings: &CaptureSettings) {
        self.settings = Some(*settings);
    }

    fn read(&mut self) -> Option<RgbImage> {
        self.reads += 1;
        if let Some((clock, interval)) = &self.clock {
            clock.advance(*interval);
        }
        self.frames.pop_front()
    }

    fn release(&mut self) {
        self.released = true;
    }
}

/// One call to `show`.
#[derive(Debug, Clone)]
pub struct ShownFrame {
    pub window_name: String,
    pub dimensions: (u32, u32),
    pub overlay: Overlay,
}

/// Records shown frames and plays back scripted key presses.
#[derive(Debug, Default)]
pub struct RecordingDisplay {
    shown: Vec<ShownFrame>,
    keys: VecDeque<Option<i32>>,
    poll_timeouts: Vec<u32>,
    fail_on_show: Option<usize>,
    destroyed: bool,
}

impl RecordingDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Key poll results in order. Once exhausted, every poll returns no key.
    pub fn with_keys(mut self, keys: impl IntoIterator<Item = Option<i32>>) -> Self {
        self.keys = keys.into_iter().collect();
        self
    }

    /// Makes the `n`th call to `show` (0-based) fail.
    pub fn failing_on_show(mut self, n: usize) -> Self {
        self.fail_on_show = Some(n);
        self
    }

    pub fn shown(&self) -> &[ShownFrame] {
        &self.shown
    }

    pub fn poll_timeouts(&self) -> &[u32] {
        &self.poll_timeouts
    }

    pub fn is_destroyed(&self) -> bool {
        self.destroyed
    }
}

impl DisplaySink for RecordingDisplay {
    fn show(
        &mut self,
        window_name: &str,
        frame: RgbImage,
        overlay: &Overlay,
    ) -> Result<(), MotionError> {
        if self.fail_on_show == Some(self.shown.len()) {
            return Err(MotionError::Display(format!(
                "window {window_name:?} is unavailable"
            )));
        }
        self.shown.push(ShownFrame {
            window_name: window_name.to_string(),
            dimensions: frame.dimensions(),
            overlay: overlay.clone(),
        });
        Ok(())
    }

    fn poll_key(&mut self, timeout_ms: u32) -> Option<i32> {
        self.poll_timeouts.push(timeout_ms);
        self.keys.pop_front().flatten()
    }

    fn destroy_all_windows(&mut self) {
        self.destroyed = true;
    }
}
