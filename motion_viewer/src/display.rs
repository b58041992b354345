use image::{Rgb, RgbImage};
use motion_tiles::{DisplaySink, Label, MotionError, Overlay};
use opencv::{
    core::{self, Mat, Point, Scalar},
    highgui, imgproc,
    prelude::*,
};
use tracing::warn;

/// An OpenCV HighGUI window.
#[derive(Default)]
pub struct HighGuiDisplay;

impl HighGuiDisplay {
    pub fn new() -> Self {
        Self
    }
}

/// Overlay colors are RGB; the Mat being drawn on is BGR.
fn bgr(color: Rgb<u8>) -> Scalar {
    let [r, g, b] = color.0;
    Scalar::new(b as f64, g as f64, r as f64, 0.0)
}

fn to_bgr_mat(frame: &RgbImage) -> opencv::Result<Mat> {
    let (width, height) = frame.dimensions();
    let mut rgb = Mat::new_rows_cols_with_default(
        height as i32,
        width as i32,
        core::CV_8UC3,
        Scalar::all(0.0),
    )?;
    rgb.data_bytes_mut()?.copy_from_slice(frame.as_raw());
    let mut bgr_mat = Mat::default();
    imgproc::cvt_color(&rgb, &mut bgr_mat, imgproc::COLOR_RGB2BGR, 0)?;
    Ok(bgr_mat)
}

fn put_label(canvas: &mut Mat, label: &Label) -> opencv::Result<()> {
    imgproc::put_text(
        canvas,
        &label.text,
        Point::new(label.origin.0, label.origin.1),
        imgproc::FONT_HERSHEY_SIMPLEX,
        label.scale,
        bgr(label.color),
        label.thickness,
        imgproc::LINE_AA,
        false,
    )
}

/// Rasterises `overlay` onto `canvas` in the order flagged tiles, grid, text.
fn draw_overlay(canvas: &mut Mat, overlay: &Overlay) -> opencv::Result<()> {
    for outline in &overlay.flagged {
        imgproc::rectangle_points(
            canvas,
            Point::new(outline.top_left.0, outline.top_left.1),
            Point::new(outline.bottom_right.0, outline.bottom_right.1),
            bgr(outline.color),
            outline.thickness,
            imgproc::LINE_8,
            0,
        )?;
    }
    for line in &overlay.grid_lines {
        imgproc::line(
            canvas,
            Point::new(line.from.0, line.from.1),
            Point::new(line.to.0, line.to.1),
            bgr(line.color),
            line.thickness,
            imgproc::LINE_8,
            0,
        )?;
    }
    for label in overlay.labels() {
        put_label(canvas, label)?;
    }
    Ok(())
}

impl DisplaySink for HighGuiDisplay {
    fn show(
        &mut self,
        window_name: &str,
        frame: RgbImage,
        overlay: &Overlay,
    ) -> Result<(), MotionError> {
        let render = || -> opencv::Result<()> {
            let mut canvas = to_bgr_mat(&frame)?;
            draw_overlay(&mut canvas, overlay)?;
            highgui::imshow(window_name, &canvas)
        };
        render().map_err(|e| MotionError::Display(e.to_string()))
    }

    fn poll_key(&mut self, timeout_ms: u32) -> Option<i32> {
        match highgui::wait_key(timeout_ms as i32) {
            Ok(-1) => None,
            Ok(key) => Some(key),
            Err(e) => {
                warn!(error = %e, "key poll failed");
                None
            }
        }
    }

    fn destroy_all_windows(&mut self) {
        if let Err(e) = highgui::destroy_all_windows() {
            warn!(error = %e, "closing windows failed");
        }
    }
}
