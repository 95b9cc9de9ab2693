use super::FrameSource;
use anyhow::{Context, Result};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType};
use nokhwa::Camera;

pub struct WebcamCapture {
    camera: Camera,
    width: u32,
    height: u32,
}

impl WebcamCapture {
    pub fn new(device_index: u32, width: u32, height: u32, fps: u32) -> Result<Self> {
        tracing::info!(
            "Initializing webcam {} at {}x{} @ {}fps",
            device_index,
            width,
            height,
            fps
        );

        let index = CameraIndex::Index(device_index);
        let closest = CameraFormat::new_from(width, height, FrameFormat::MJPEG, fps);
        let requested =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::Closest(closest));

        let mut camera = Camera::new(index, requested).context("Failed to open camera")?;

        camera
            .open_stream()
            .context("Failed to open camera stream")?;

        // The driver may settle on a different size than requested
        let resolution = camera.resolution();
        let (width, height) = (resolution.width(), resolution.height());

        tracing::info!("Webcam streaming at {}x{}", width, height);

        Ok(Self {
            camera,
            width,
            height,
        })
    }
}

impl FrameSource for WebcamCapture {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let frame = self.camera.frame().context("Failed to capture frame")?;

        let decoded = frame
            .decode_image::<RgbFormat>()
            .context("Failed to decode frame")?;

        let (width, height) = decoded.dimensions();
        let rgb = RgbImage::from_raw(width, height, decoded.into_raw())
            .context("Decoded frame has an unexpected buffer size")?;

        Ok(Some(rgb))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl Drop for WebcamCapture {
    fn drop(&mut self) {
        match self.camera.stop_stream() {
            Ok(()) => tracing::info!("Webcam released"),
            Err(e) => tracing::warn!("Failed to stop camera stream: {}", e),
        }
    }
}
