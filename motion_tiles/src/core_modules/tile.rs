// THEORY:
// A `Tile` is the unit of regional analysis: the rectangle of a `LumaFrame` that one
// grid cell covers. Its only job is to summarise that rectangle as a single number,
// the arithmetic mean brightness.
//
// Averaging over the whole tile is what makes the detector coarse on purpose.
// Single-pixel sensor noise cancels out, and only spatially coherent changes in
// brightness move the mean far enough to cross the threshold.

pub mod tile {
    use crate::core_modules::luma_frame::luma_frame::LumaFrame;
    use crate::core_modules::tile_grid::TileRect;

    /// A borrowed view of one tile's pixels.
    pub struct Tile<'a> {
        frame: &'a LumaFrame,
        rect: TileRect,
    }

    impl<'a> Tile<'a> {
        pub fn new(frame: &'a LumaFrame, rect: TileRect) -> Self {
            debug_assert!(rect.x1 <= frame.width() && rect.y1 <= frame.height());
            Self { frame, rect }
        }

        pub fn rect(&self) -> TileRect {
            self.rect
        }

        /// Sum of every sample inside the tile.
        pub fn sum(&self) -> u64 {
            let (x0, x1) = (self.rect.x0 as usize, self.rect.x1 as usize);
            (self.rect.y0..self.rect.y1)
                .map(|y| {
                    self.frame.row(y)[x0..x1]
                        .iter()
                        .map(|&v| v as u64)
                        .sum::<u64>()
                })
                .sum()
        }

        /// Arithmetic mean brightness. An empty tile reads as 0.0.
        pub fn mean(&self) -> f64 {
            let area = self.rect.area();
            if area == 0 {
                return 0.0;
            }
            self.sum() as f64 / area as f64
        }
    }
}
