// THEORY:
// The `TileGrid` is the fixed spatial partition the whole engine works on. It is
// built once from the dimensions of the first captured frame and never changes for
// the life of the process.
//
// Key architectural principles:
// 1.  **Floor Division**: Tile width and height are `w / GX` and `h / GY`. Tile
//     `(tx, ty)` starts at `(tx * tw, ty * th)`.
// 2.  **Full Coverage**: When the frame is not evenly divisible, the last column and
//     the last row run to the frame edge. Every pixel belongs to exactly one tile,
//     so no pixel is skipped and no read goes out of bounds.
// 3.  **Row-Major Indexing**: Tiles are enumerated `ty` first, then `tx`. A tile's
//     linear index is `ty * GX + tx`; flags and means are stored in that order.

use crate::error::MotionError;

/// Grid coordinates of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TileIndex {
    pub tx: u32,
    pub ty: u32,
}

impl TileIndex {
    pub fn new(tx: u32, ty: u32) -> Self {
        Self { tx, ty }
    }
}

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileRect {
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl TileRect {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }

    pub fn area(&self) -> u64 {
        self.width() as u64 * self.height() as u64
    }

    pub fn contains(&self, x: u32, y: u32) -> bool {
        x >= self.x0 && x < self.x1 && y >= self.y0 && y < self.y1
    }
}

/// The fixed GX x GY partition of a frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileGrid {
    /// Frame width in pixels.
    width: u32,
    /// Frame height in pixels.
    height: u32,
    /// Tiles across.
    grid_x: u32,
    /// Tiles down.
    grid_y: u32,
    /// Nominal tile width (`width / grid_x`).
    tile_width: u32,
    /// Nominal tile height (`height / grid_y`).
    tile_height: u32,
}

impl TileGrid {
    /// Builds the grid for a frame of `width x height`. Fails if the frame is smaller
    /// than the grid in either direction, since that would leave tiles with no pixels.
    pub fn new(width: u32, height: u32, grid_x: u32, grid_y: u32) -> Result<Self, MotionError> {
        if grid_x == 0 || grid_y == 0 || width < grid_x || height < grid_y {
            return Err(MotionError::InvalidGrid {
                width,
                height,
                grid_x,
                grid_y,
            });
        }
        Ok(Self {
            width,
            height,
            grid_x,
            grid_y,
            tile_width: width / grid_x,
            tile_height: height / grid_y,
        })
    }

    pub fn frame_dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn grid_dimensions(&self) -> (u32, u32) {
        (self.grid_x, self.grid_y)
    }

    pub fn tile_dimensions(&self) -> (u32, u32) {
        (self.tile_width, self.tile_height)
    }

    pub fn tile_count(&self) -> usize {
        self.grid_x as usize * self.grid_y as usize
    }

    /// Row-major linear index of a tile.
    pub fn linear_index(&self, index: TileIndex) -> usize {
        index.ty as usize * self.grid_x as usize + index.tx as usize
    }

    /// The pixel rectangle covered by tile `(tx, ty)`. The last column and row
    /// extend to the frame edge.
    pub fn tile_rect(&self, index: TileIndex) -> TileRect {
        debug_assert!(index.tx < self.grid_x && index.ty < self.grid_y);
        let x0 = index.tx * self.tile_width;
        let y0 = index.ty * self.tile_height;
        let x1 = if index.tx + 1 == self.grid_x {
            self.width
        } else {
            x0 + self.tile_width
        };
        let y1 = if index.ty + 1 == self.grid_y {
            self.height
        } else {
            y0 + self.tile_height
        };
        TileRect { x0, y0, x1, y1 }
    }

    /// All tile indices in row-major order (`ty` outer, `tx` inner).
    pub fn indices(&self) -> impl Iterator<Item = TileIndex> + '_ {
        (0..self.grid_y).flat_map(move |ty| (0..self.grid_x).map(move |tx| TileIndex { tx, ty }))
    }

    /// The tile indices of a single grid row.
    pub fn row_indices(&self, ty: u32) -> impl Iterator<Item = TileIndex> + '_ {
        (0..self.grid_x).map(move |tx| TileIndex { tx, ty })
    }

    /// x positions of the vertical tile boundaries, left edge included.
    pub fn column_boundaries(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.grid_x).map(move |tx| tx * self.tile_width)
    }

    /// y positions of the horizontal tile boundaries, top edge included.
    pub fn row_boundaries(&self) -> impl Iterator<Item = u32> + '_ {
        (0..self.grid_y).map(move |ty| ty * self.tile_height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_exact_cover(width: u32, height: u32, grid_x: u32, grid_y: u32) {
        let grid = TileGrid::new(width, height, grid_x, grid_y).expect("valid grid");
        let mut owners = vec![0u32; (width * height) as usize];
        for index in grid.indices() {
            let rect = grid.tile_rect(index);
            assert!(rect.x1 <= width && rect.y1 <= height, "{rect:?} out of bounds");
            assert!(rect.area() > 0, "{index:?} is empty");
            for y in rect.y0..rect.y1 {
                for x in rect.x0..rect.x1 {
                    owners[(y * width + x) as usize] += 1;
                }
            }
        }
        assert!(
            owners.iter().all(|&n| n == 1),
            "{width}x{height} / {grid_x}x{grid_y} is not an exact cover"
        );
    }

    #[test]
    fn tiles_exactly_cover_divisible_frames() {
        assert_exact_cover(32, 32, 16, 16);
        assert_exact_cover(1280, 720, 16, 16);
    }

    #[test]
    fn tiles_exactly_cover_non_divisible_frames() {
        assert_exact_cover(33, 31, 16, 16);
        assert_exact_cover(37, 19, 5, 3);
        assert_exact_cover(16, 16, 16, 16);
        assert_exact_cover(7, 1, 7, 1);
    }

    #[test]
    fn edge_tiles_absorb_the_remainder() {
        let grid = TileGrid::new(35, 20, 4, 3).unwrap();
        assert_eq!(grid.tile_dimensions(), (8, 6));
        assert_eq!(
            grid.tile_rect(TileIndex::new(0, 0)),
            TileRect { x0: 0, y0: 0, x1: 8, y1: 6 }
        );
        assert_eq!(
            grid.tile_rect(TileIndex::new(3, 2)),
            TileRect { x0: 24, y0: 12, x1: 35, y1: 20 }
        );
    }

    #[test]
    fn indices_are_row_major_and_exhaustive() {
        let grid = TileGrid::new(10, 10, 3, 2).unwrap();
        let order: Vec<_> = grid.indices().map(|i| (i.tx, i.ty)).collect();
        assert_eq!(order, vec![(0, 0), (1, 0), (2, 0), (0, 1), (1, 1), (2, 1)]);
        for (n, index) in grid.indices().enumerate() {
            assert_eq!(grid.linear_index(index), n);
        }
        assert_eq!(grid.tile_count(), 6);
    }

    #[test]
    fn frame_smaller_than_grid_is_rejected() {
        assert!(matches!(
            TileGrid::new(8, 32, 16, 16),
            Err(MotionError::InvalidGrid { width: 8, .. })
        ));
        assert!(TileGrid::new(32, 32, 0, 16).is_err());
    }

    #[test]
    fn boundaries_start_at_zero_and_step_by_tile_size() {
        let grid = TileGrid::new(100, 50, 4, 5).unwrap();
        assert_eq!(grid.column_boundaries().collect::<Vec<_>>(), vec![0, 25, 50, 75]);
        assert_eq!(grid.row_boundaries().collect::<Vec<_>>(), vec![0, 10, 20, 30, 40]);
    }
}
