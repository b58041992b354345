// THEORY:
// The `DifferenceEngine` is the detector. Given the current and previous luminance
// frames it compares every tile's mean brightness between the two and flags the
// tiles whose mean moved by more than the threshold.
//
// Key architectural principles:
// 1.  **Exhaustive**: Every tile is visited every frame, row-major, with no early
//     exit and no spatial skipping. Each pixel of both frames is read exactly once.
// 2.  **Stateless**: The engine owns only the grid. The previous frame and the
//     threshold belong to the control loop and are passed in per call.
// 3.  **Optional Parallelism**: Tile means are independent, so grid rows can be
//     split into bands and handed to scoped worker threads. Bands are joined back in
//     row order before any threshold comparison, so the sequential and parallel
//     paths produce identical flags.
// 4.  **Invariant, Not Error**: Both frames must match the grid's dimensions. A
//     mismatch is a bug in the caller and panics.

use crate::core_modules::luma_frame::luma_frame::LumaFrame;
use crate::core_modules::threshold::Threshold;
use crate::core_modules::tile::tile::Tile;
use crate::core_modules::tile_grid::{TileGrid, TileIndex};
use std::thread;

/// The tiles flagged in one frame, in row-major order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlaggedTiles {
    indices: Vec<TileIndex>,
}

impl FlaggedTiles {
    pub fn len(&self) -> usize {
        self.indices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    pub fn contains(&self, index: TileIndex) -> bool {
        self.indices.contains(&index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TileIndex> {
        self.indices.iter()
    }

    pub fn as_slice(&self) -> &[TileIndex] {
        &self.indices
    }
}

/// Compares tile means between consecutive frames.
pub struct DifferenceEngine {
    grid: TileGrid,
    /// Worker threads used for tile means. 1 means inline on the caller's thread.
    workers: usize,
}

impl DifferenceEngine {
    pub fn new(grid: TileGrid) -> Self {
        Self { grid, workers: 1 }
    }

    /// Spreads tile rows over one scoped worker per CPU when `enabled`.
    pub fn with_parallelism(mut self, enabled: bool) -> Self {
        self.workers = if enabled { num_cpus::get().max(1) } else { 1 };
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn grid(&self) -> &TileGrid {
        &self.grid
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Absolute difference of tile means, one entry per tile in row-major order.
    pub fn tile_deltas(&self, current: &LumaFrame, previous: &LumaFrame) -> Vec<f64> {
        assert_eq!(
            current.dimensions(),
            previous.dimensions(),
            "current and previous luminance frames must have the same dimensions"
        );
        assert_eq!(
            current.dimensions(),
            self.grid.frame_dimensions(),
            "luminance frame does not match the tile grid"
        );

        let (_, grid_y) = self.grid.grid_dimensions();
        let bands = self.workers.min(grid_y as usize);
        if bands <= 1 {
            return self.band_deltas(current, previous, 0..grid_y);
        }

        let rows_per_band = (grid_y as usize).div_ceil(bands) as u32;
        thread::scope(|scope| {
            let handles: Vec<_> = (0..grid_y)
                .step_by(rows_per_band as usize)
                .map(|start| {
                    let end = (start + rows_per_band).min(grid_y);
                    scope.spawn(move || self.band_deltas(current, previous, start..end))
                })
                .collect();

            let mut deltas = Vec::with_capacity(self.grid.tile_count());
            for handle in handles {
                match handle.join() {
                    Ok(band) => deltas.extend(band),
                    Err(panic) => std::panic::resume_unwind(panic),
                }
            }
            deltas
        })
    }

    /// Flags every tile whose mean brightness moved by more than `threshold`.
    pub fn detect(
        &self,
        current: &LumaFrame,
        previous: &LumaFrame,
        threshold: Threshold,
    ) -> FlaggedTiles {
        let deltas = self.tile_deltas(current, previous);
        let indices = self
            .grid
            .indices()
            .zip(deltas)
            .filter(|(_, delta)| threshold.is_exceeded_by(*delta))
            .map(|(index, _)| index)
            .collect();
        FlaggedTiles { indices }
    }

    fn band_deltas(
        &self,
        current: &LumaFrame,
        previous: &LumaFrame,
        rows: std::ops::Range<u32>,
    ) -> Vec<f64> {
        let (grid_x, _) = self.grid.grid_dimensions();
        let mut deltas = Vec::with_capacity(rows.len() * grid_x as usize);
        for ty in rows {
            for index in self.grid.row_indices(ty) {
                let rect = self.grid.tile_rect(index);
                let mean_current = Tile::new(current, rect).mean();
                let mean_previous = Tile::new(previous, rect).mean();
                deltas.push((mean_current - mean_previous).abs());
            }
        }
        deltas
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine(width: u32, height: u32, grid_x: u32, grid_y: u32) -> DifferenceEngine {
        DifferenceEngine::new(TileGrid::new(width, height, grid_x, grid_y).unwrap())
    }

    /// Adds `amount` to every sample inside tile `index`.
    fn brighten_tile(frame: &mut LumaFrame, grid: &TileGrid, index: TileIndex, amount: u8) {
        let rect = grid.tile_rect(index);
        let width = frame.width();
        let samples = frame.samples_mut();
        for y in rect.y0..rect.y1 {
            for x in rect.x0..rect.x1 {
                let i = (y * width + x) as usize;
                samples[i] = samples[i].saturating_add(amount);
            }
        }
    }

    #[test]
    fn identical_frames_flag_nothing_for_any_threshold() {
        let engine = engine(37, 23, 16, 16);
        let mut frame = LumaFrame::filled(37, 23, 0);
        for (i, sample) in frame.samples_mut().iter_mut().enumerate() {
            *sample = (i * 7 % 256) as u8;
        }
        for t in [0u8, 1, 15, 128, 255] {
            let flags = engine.detect(&frame, &frame.clone(), Threshold::new(t));
            assert!(flags.is_empty(), "threshold {t} flagged {flags:?}");
        }
    }

    #[test]
    fn single_tile_over_threshold_is_the_only_flag() {
        let engine = engine(64, 48, 16, 16);
        let previous = LumaFrame::filled(64, 48, 100);
        let mut current = previous.clone();
        let target = TileIndex::new(5, 9);
        brighten_tile(&mut current, engine.grid(), target, 16);

        let flags = engine.detect(&current, &previous, Threshold::new(15));
        assert_eq!(flags.as_slice(), &[target]);
        assert!(flags.contains(target));
        assert!(!flags.contains(TileIndex::new(4, 9)));
    }

    #[test]
    fn delta_equal_to_threshold_is_not_flagged() {
        let engine = engine(32, 32, 16, 16);
        let previous = LumaFrame::filled(32, 32, 100);
        let mut current = previous.clone();
        brighten_tile(&mut current, engine.grid(), TileIndex::new(0, 0), 15);
        assert!(engine.detect(&current, &previous, Threshold::new(15)).is_empty());
    }

    #[test]
    fn darkening_is_detected_like_brightening() {
        let engine = engine(32, 32, 4, 4);
        let current = LumaFrame::filled(32, 32, 10);
        let mut previous = current.clone();
        brighten_tile(&mut previous, engine.grid(), TileIndex::new(3, 3), 50);
        let flags = engine.detect(&current, &previous, Threshold::new(15));
        assert_eq!(flags.as_slice(), &[TileIndex::new(3, 3)]);
    }

    #[test]
    fn remainder_tile_uses_its_full_extent() {
        // 35 / 4 = 8, so the last column spans x = 24..35.
        let engine = engine(35, 20, 4, 2);
        let previous = LumaFrame::filled(35, 20, 0);
        let mut current = previous.clone();
        let width = current.width();
        // Change only the remainder pixels x = 32..35 of the top row of tiles.
        for y in 0..10 {
            for x in 32..35 {
                current.samples_mut()[(y * width + x) as usize] = 255;
            }
        }
        let deltas = engine.tile_deltas(&current, &previous);
        // 3 of 11 columns changed by 255.
        assert!((deltas[3] - 255.0 * 3.0 / 11.0).abs() < 1e-9);
        assert_eq!(deltas[7], 0.0);
        let flags = engine.detect(&current, &previous, Threshold::new(15));
        assert_eq!(flags.as_slice(), &[TileIndex::new(3, 0)]);
    }

    #[test]
    fn flags_are_row_major() {
        let engine = engine(16, 16, 4, 4);
        let previous = LumaFrame::filled(16, 16, 0);
        let mut current = previous.clone();
        for index in [TileIndex::new(3, 2), TileIndex::new(0, 1), TileIndex::new(2, 0)] {
            brighten_tile(&mut current, engine.grid(), index, 200);
        }
        let flags = engine.detect(&current, &previous, Threshold::new(15));
        assert_eq!(
            flags.as_slice(),
            &[TileIndex::new(2, 0), TileIndex::new(0, 1), TileIndex::new(3, 2)]
        );
    }

    #[test]
    fn parallel_matches_sequential() {
        let grid = TileGrid::new(101, 77, 16, 16).unwrap();
        let sequential = DifferenceEngine::new(grid.clone());
        let parallel = DifferenceEngine::new(grid).with_workers(5);

        let mut previous = LumaFrame::filled(101, 77, 0);
        let mut current = LumaFrame::filled(101, 77, 0);
        for (i, sample) in previous.samples_mut().iter_mut().enumerate() {
            *sample = (i * 31 % 251) as u8;
        }
        for (i, sample) in current.samples_mut().iter_mut().enumerate() {
            *sample = (i * 17 % 241) as u8;
        }

        assert_eq!(
            sequential.tile_deltas(&current, &previous),
            parallel.tile_deltas(&current, &previous)
        );
        for t in [0u8, 5, 15, 40] {
            assert_eq!(
                sequential.detect(&current, &previous, Threshold::new(t)),
                parallel.detect(&current, &previous, Threshold::new(t))
            );
        }
    }

    #[test]
    #[should_panic(expected = "same dimensions")]
    fn mismatched_frames_panic() {
        let engine = engine(32, 32, 16, 16);
        let current = LumaFrame::filled(32, 32, 0);
        let previous = LumaFrame::filled(32, 30, 0);
        engine.detect(&current, &previous, Threshold::new(15));
    }
}
