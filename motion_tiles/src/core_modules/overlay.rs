// THEORY:
// The `Overlay` is the output contract between the engine and whatever draws on
// screen. The engine decides what goes on the frame (grid lines, flagged tile
// rectangles, metric text and a help note) and where; a display backend only has to
// rasterise primitives. Keeping the layout here means the layout is tested without
// a window system.

use crate::core_modules::difference_engine::FlaggedTiles;
use crate::core_modules::latency::FrameMetrics;
use crate::core_modules::tile_grid::TileGrid;
use image::Rgb;

pub const GRID_COLOR: Rgb<u8> = Rgb([60, 60, 60]);
pub const FLAG_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const PROCESSING_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const FRAME_TIME_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const END_TO_END_COLOR: Rgb<u8> = Rgb([255, 255, 0]);
pub const TOTAL_LATENCY_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const NOTE_COLOR: Rgb<u8> = Rgb([180, 180, 180]);

pub const HELP_NOTE: &str =
    "Note: Total Latency = Frame Time + Raw E2E (sensor + driver + processing)";

const METRIC_TEXT_X: i32 = 10;
const METRIC_TEXT_FIRST_Y: i32 = 50;
const METRIC_LINE_SPACING: i32 = 26;
const METRIC_TEXT_SCALE: f64 = 0.7;
const METRIC_TEXT_THICKNESS: i32 = 2;
const NOTE_BOTTOM_MARGIN: i32 = 20;
const NOTE_TEXT_SCALE: f64 = 0.5;
const FLAG_THICKNESS: i32 = 2;

/// A straight line between two pixel positions, endpoints inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub from: (i32, i32),
    pub to: (i32, i32),
    pub color: Rgb<u8>,
    pub thickness: i32,
}

/// An outlined rectangle between two inclusive corners.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outline {
    pub top_left: (i32, i32),
    pub bottom_right: (i32, i32),
    pub color: Rgb<u8>,
    pub thickness: i32,
}

/// A line of text anchored at its baseline-left corner.
#[derive(Debug, Clone, PartialEq)]
pub struct Label {
    pub text: String,
    pub origin: (i32, i32),
    pub color: Rgb<u8>,
    pub scale: f64,
    pub thickness: i32,
}

/// Everything drawn on top of one frame, in drawing order: flagged tiles, grid,
/// metrics, note.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Overlay {
    pub flagged: Vec<Outline>,
    pub grid_lines: Vec<Line>,
    pub metrics: Vec<Label>,
    pub note: Option<Label>,
}

impl Overlay {
    pub fn build(grid: &TileGrid, flagged: &FlaggedTiles, metrics: &FrameMetrics) -> Self {
        let (_, height) = grid.frame_dimensions();
        Self {
            flagged: flag_outlines(grid, flagged),
            grid_lines: grid_lines(grid),
            metrics: metric_labels(metrics),
            note: Some(Label {
                text: HELP_NOTE.to_string(),
                origin: (METRIC_TEXT_X, height as i32 - NOTE_BOTTOM_MARGIN),
                color: NOTE_COLOR,
                scale: NOTE_TEXT_SCALE,
                thickness: 1,
            }),
        }
    }

    /// Labels in drawing order, metrics first.
    pub fn labels(&self) -> impl Iterator<Item = &Label> {
        self.metrics.iter().chain(self.note.iter())
    }
}

fn flag_outlines(grid: &TileGrid, flagged: &FlaggedTiles) -> Vec<Outline> {
    flagged
        .iter()
        .map(|&index| {
            let rect = grid.tile_rect(index);
            Outline {
                top_left: (rect.x0 as i32, rect.y0 as i32),
                bottom_right: (rect.x1 as i32 - 1, rect.y1 as i32 - 1),
                color: FLAG_COLOR,
                thickness: FLAG_THICKNESS,
            }
        })
        .collect()
}

fn grid_lines(grid: &TileGrid) -> Vec<Line> {
    let (width, height) = grid.frame_dimensions();
    let (width, height) = (width as i32, height as i32);
    let vertical = grid.column_boundaries().map(|x| Line {
        from: (x as i32, 0),
        to: (x as i32, height),
        color: GRID_COLOR,
        thickness: 1,
    });
    let horizontal = grid.row_boundaries().map(|y| Line {
        from: (0, y as i32),
        to: (width, y as i32),
        color: GRID_COLOR,
        thickness: 1,
    });
    vertical.chain(horizontal).collect()
}

fn metric_labels(metrics: &FrameMetrics) -> Vec<Label> {
    let lines = [
        (
            format!("Proc Latency: {:.2} ms", metrics.processing_latency_ms),
            PROCESSING_COLOR,
        ),
        (
            format!("Frame Time: {:.2} ms", metrics.delivered_frame_time_ms),
            FRAME_TIME_COLOR,
        ),
        (
            format!("End-to-End (raw): {:.2} ms", metrics.end_to_end_latency_ms_raw),
            END_TO_END_COLOR,
        ),
        (
            format!("Est. Total Latency: {:.2} ms", metrics.estimated_total_latency_ms),
            TOTAL_LATENCY_COLOR,
        ),
    ];
    lines
        .into_iter()
        .enumerate()
        .map(|(row, (text, color))| Label {
            text,
            origin: (
                METRIC_TEXT_X,
                METRIC_TEXT_FIRST_Y + row as i32 * METRIC_LINE_SPACING,
            ),
            color,
            scale: METRIC_TEXT_SCALE,
            thickness: METRIC_TEXT_THICKNESS,
        })
        .collect()
}
