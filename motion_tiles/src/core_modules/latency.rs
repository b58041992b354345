// THEORY:
// The `latency` module turns four timestamps per frame into the numbers shown on the
// overlay. It keeps only two pieces of state across frames: the capture timestamp
// of the previous frame and the smoothed FPS accumulator. Everything else is
// computed from the current `TimingSample` and dropped.
//
// Key architectural principles:
// 1.  **Injected Time**: Timestamps come from a `Clock`. The live loop uses the
//     monotonic system clock; tests drive a `ManualClock` so every metric is exact.
// 2.  **Monotonic Metrics**: Intervals use `saturating_duration_since`, so no metric
//     can go negative even if timestamps arrive out of order.
// 3.  **Diagnostic, Not Metrological**: The estimated total latency is the delivered
//     frame time plus the raw end-to-end time. The two windows can overlap; the sum
//     is kept as a display figure.

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Lower bound on the processing duration used for the FPS estimate, in seconds.
pub const MIN_PROCESSING_SECONDS: f64 = 1e-6;
/// Weight kept from the previous EMA value on each update.
pub const FPS_EMA_RETAIN: f64 = 0.9;

/// A source of monotonic timestamps.
pub trait Clock {
    fn now(&self) -> Instant;
}

/// The process monotonic clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// A clock that only moves when told to. Clones share the same time, so a test can
/// hand one clone to a synthetic source and another to the pipeline.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Rc<Cell<Duration>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Rc::new(Cell::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.elapsed.set(self.elapsed.get() + by);
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed.get()
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed.get()
    }
}

/// The timestamps taken around one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimingSample {
    /// Taken just before the frame read was issued.
    pub capture: Instant,
    pub processing_start: Instant,
    pub processing_end: Instant,
    /// Taken just before the overlay is rendered and shown.
    pub display: Instant,
}

/// Per-frame metrics, all latencies in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FrameMetrics {
    /// Interval between this frame's capture call and the previous one. 0.0 on the first frame.
    pub delivered_frame_time_ms: f64,
    pub processing_latency_ms: f64,
    /// Capture call to display, including processing.
    pub end_to_end_latency_ms_raw: f64,
    /// `delivered_frame_time_ms + end_to_end_latency_ms_raw`.
    pub estimated_total_latency_ms: f64,
    pub fps_instant: f64,
    pub fps_smoothed: f64,
}

fn millis(duration: Duration) -> f64 {
    duration.as_secs_f64() * 1000.0
}

/// Frames per second implied by a single processing duration.
pub fn instant_fps(processing: Duration) -> f64 {
    1.0 / processing.as_secs_f64().max(MIN_PROCESSING_SECONDS)
}

/// Exponential moving average of the processing-based FPS. The first sample seeds the
/// average as-is.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FpsEma {
    value: Option<f64>,
}

impl FpsEma {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, sample: f64) -> f64 {
        let next = match self.value {
            None => sample,
            Some(ema) => FPS_EMA_RETAIN * ema + (1.0 - FPS_EMA_RETAIN) * sample,
        };
        self.value = Some(next);
        next
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }
}

/// Running latency and FPS state for the control loop.
#[derive(Debug, Clone, Default)]
pub struct LatencyTracker {
    last_frame_time: Option<Instant>,
    fps: FpsEma,
}

impl LatencyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Computes the metrics for one frame and advances the running state.
    pub fn observe(&mut self, sample: &TimingSample) -> FrameMetrics {
        let delivered_frame_time_ms = self
            .last_frame_time
            .map(|last| millis(sample.capture.saturating_duration_since(last)))
            .unwrap_or(0.0);
        self.last_frame_time = Some(sample.capture);

        let processing = sample
            .processing_end
            .saturating_duration_since(sample.processing_start);
        let processing_latency_ms = millis(processing);
        let end_to_end_latency_ms_raw =
            millis(sample.display.saturating_duration_since(sample.capture));
        let estimated_total_latency_ms = delivered_frame_time_ms + end_to_end_latency_ms_raw;

        let fps_instant = instant_fps(processing);
        let fps_smoothed = self.fps.update(fps_instant);

        FrameMetrics {
            delivered_frame_time_ms,
            processing_latency_ms,
            end_to_end_latency_ms_raw,
            estimated_total_latency_ms,
            fps_instant,
            fps_smoothed,
        }
    }

    pub fn last_frame_time(&self) -> Option<Instant> {
        self.last_frame_time
    }

    pub fn smoothed_fps(&self) -> Option<f64> {
        self.fps.value()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    fn sample_at(
        clock: &ManualClock,
        frame_gap: Duration,
        processing: Duration,
        after: Duration,
    ) -> TimingSample {
        clock.advance(frame_gap);
        let capture = clock.now();
        let processing_start = clock.now();
        clock.advance(processing);
        let processing_end = clock.now();
        clock.advance(after);
        let display = clock.now();
        TimingSample {
            capture,
            processing_start,
            processing_end,
            display,
        }
    }

    #[test]
    fn first_frame_has_zero_delivered_time() {
        let clock = ManualClock::new();
        let mut tracker = LatencyTracker::new();
        let sample = sample_at(&clock, Duration::ZERO, Duration::from_millis(4), Duration::ZERO);
        let metrics = tracker.observe(&sample);
        assert_eq!(metrics.delivered_frame_time_ms, 0.0);
        assert_eq!(tracker.last_frame_time(), Some(sample.capture));
    }

    #[test]
    fn delivered_time_is_capture_to_capture() {
        let clock = ManualClock::new();
        let mut tracker = LatencyTracker::new();
        let first = sample_at(&clock, Duration::ZERO, Duration::from_millis(2), Duration::from_millis(1));
        tracker.observe(&first);
        // 13 ms gap after the previous display plus the 3 ms already spent in frame one.
        let second = sample_at(&clock, Duration::from_millis(13), Duration::from_millis(2), Duration::ZERO);
        let metrics = tracker.observe(&second);
        assert!((metrics.delivered_frame_time_ms - 16.0).abs() < EPS);
    }

    #[test]
    fn latency_components_add_up() {
        let clock = ManualClock::new();
        let mut tracker = LatencyTracker::new();
        tracker.observe(&sample_at(&clock, Duration::ZERO, Duration::from_millis(1), Duration::ZERO));
        let sample = sample_at(
            &clock,
            Duration::from_millis(19),
            Duration::from_millis(5),
            Duration::from_millis(2),
        );
        let metrics = tracker.observe(&sample);
        assert!((metrics.delivered_frame_time_ms - 20.0).abs() < EPS);
        assert!((metrics.processing_latency_ms - 5.0).abs() < EPS);
        assert!((metrics.end_to_end_latency_ms_raw - 7.0).abs() < EPS);
        assert!((metrics.estimated_total_latency_ms - 27.0).abs() < EPS);
        assert!((metrics.fps_instant - 200.0).abs() < 1e-6);
    }

    #[test]
    fn zero_processing_time_is_guarded() {
        assert!((instant_fps(Duration::ZERO) - 1e6).abs() < 1e-3);
        assert!(instant_fps(Duration::ZERO).is_finite());
    }

    #[test]
    fn ema_seeds_then_smooths() {
        let mut ema = FpsEma::new();
        assert_eq!(ema.value(), None);
        assert_eq!(ema.update(100.0), 100.0);
        assert_eq!(ema.value(), Some(100.0));
        let second = ema.update(200.0);
        assert!((second - (0.9 * 100.0 + 0.1 * 200.0)).abs() < EPS);
        let third = ema.update(50.0);
        assert!((third - (0.9 * second + 0.1 * 50.0)).abs() < EPS);
    }

    #[test]
    fn tracker_feeds_processing_fps_into_ema() {
        let clock = ManualClock::new();
        let mut tracker = LatencyTracker::new();
        let m1 = tracker.observe(&sample_at(&clock, Duration::ZERO, Duration::from_millis(10), Duration::ZERO));
        assert!((m1.fps_smoothed - 100.0).abs() < 1e-6);
        let m2 = tracker.observe(&sample_at(&clock, Duration::ZERO, Duration::from_millis(5), Duration::ZERO));
        assert!((m2.fps_smoothed - (0.9 * 100.0 + 0.1 * 200.0)).abs() < 1e-6);
        assert_eq!(tracker.smoothed_fps(), Some(m2.fps_smoothed));
    }

    #[test]
    fn out_of_order_timestamps_saturate_to_zero() {
        let clock = ManualClock::new();
        clock.advance(Duration::from_millis(50));
        let later = clock.now();
        let earlier = later - Duration::from_millis(10);
        let mut tracker = LatencyTracker::new();
        let metrics = tracker.observe(&TimingSample {
            capture: later,
            processing_start: later,
            processing_end: earlier,
            display: earlier,
        });
        assert_eq!(metrics.processing_latency_ms, 0.0);
        assert_eq!(metrics.end_to_end_latency_ms_raw, 0.0);
    }

    #[test]
    fn manual_clock_clones_share_time() {
        let clock = ManualClock::new();
        let other = clock.clone();
        let start = clock.now();
        other.advance(Duration::from_millis(16));
        assert_eq!(clock.now() - start, Duration::from_millis(16));
        assert_eq!(clock.elapsed(), Duration::from_millis(16));
    }
}
