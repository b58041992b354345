use image::RgbImage;
use motion_tiles::{CaptureSettings, FrameSource, MotionError};
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{self, VideoCapture},
};
use tracing::warn;

/// A live capture device read through OpenCV's videoio.
pub struct CameraSource {
    capture: VideoCapture,
    /// Reused BGR read buffer.
    bgr: Mat,
    device: i32,
}

impl CameraSource {
    pub fn open(device: i32) -> Result<Self, MotionError> {
        let capture = VideoCapture::new(device, videoio::CAP_ANY)
            .map_err(|e| MotionError::Source(format!("device {device}: {e}")))?;
        Ok(Self {
            capture,
            bgr: Mat::default(),
            device,
        })
    }

    fn request(&mut self, name: &str, property: i32, value: f64) {
        match self.capture.set(property, value) {
            Ok(true) => {}
            Ok(false) => warn!(device = self.device, property = name, value, "capture setting ignored"),
            Err(e) => warn!(device = self.device, property = name, value, error = %e, "capture setting failed"),
        }
    }

    fn to_rgb(&self) -> opencv::Result<Option<RgbImage>> {
        let mut rgb = Mat::default();
        imgproc::cvt_color(&self.bgr, &mut rgb, imgproc::COLOR_BGR2RGB, 0)?;
        let width = rgb.cols() as u32;
        let height = rgb.rows() as u32;
        let data = rgb.data_bytes()?.to_vec();
        Ok(RgbImage::from_raw(width, height, data))
    }
}

impl FrameSource for CameraSource {
    fn configure(&mut self, settings: &CaptureSettings) {
        // Smallest driver queue first so the remaining requests apply to a fresh stream.
        self.request("buffer_size", videoio::CAP_PROP_BUFFERSIZE, settings.buffer_size as f64);
        self.request("width", videoio::CAP_PROP_FRAME_WIDTH, settings.width as f64);
        self.request("height", videoio::CAP_PROP_FRAME_HEIGHT, settings.height as f64);
        self.request("fps", videoio::CAP_PROP_FPS, settings.fps);
    }

    fn read(&mut self) -> Option<RgbImage> {
        match self.capture.read(&mut self.bgr) {
            Ok(true) if !self.bgr.empty() => {}
            Ok(_) => return None,
            Err(e) => {
                warn!(device = self.device, error = %e, "frame read failed");
                return None;
            }
        }
        match self.to_rgb() {
            Ok(frame) => frame,
            Err(e) => {
                warn!(device = self.device, error = %e, "frame conversion failed");
                None
            }
        }
    }

    fn release(&mut self) {
        if let Err(e) = self.capture.release() {
            warn!(device = self.device, error = %e, "camera release failed");
        }
    }
}
