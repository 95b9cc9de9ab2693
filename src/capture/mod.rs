mod sequence;
#[cfg(feature = "camera")]
mod webcam;

pub use sequence::ImageSequence;
#[cfg(feature = "camera")]
pub use webcam::WebcamCapture;

use anyhow::Result;
use image::RgbImage;

/// Trait for frame sources
///
/// The source is released when dropped.
pub trait FrameSource {
    /// Acquire the next frame
    ///
    /// `Ok(None)` means the stream is exhausted.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Get the resolution of acquired frames
    fn resolution(&self) -> (u32, u32);
}

impl<S: FrameSource + ?Sized> FrameSource for Box<S> {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        (**self).next_frame()
    }

    fn resolution(&self) -> (u32, u32) {
        (**self).resolution()
    }
}
