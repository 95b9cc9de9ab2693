use super::DisplaySurface;
use anyhow::{Context, Result};
use image::{Rgb, RgbImage};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::time::Duration;
use v4l::video::Output;
use v4l::{Device, Format, FourCC};

/// Publishes annotated frames to a v4l2loopback device as YUYV
///
/// Lets other applications consume the annotated stream as a virtual camera.
pub struct V4L2Output {
    file: File,
    width: u32,
    height: u32,
    yuyv: Vec<u8>,
}

impl V4L2Output {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{})",
            path.display(),
            width,
            height
        );

        let device = Device::with_path(path)
            .with_context(|| format!("Failed to open v4l2 device at {}", path.display()))?;
        let format = Output::set_format(&device, &Format::new(width, height, FourCC::new(b"YUYV")))
            .context("Failed to set YUYV output format")?;
        tracing::debug!(
            "Loopback format: {}x{} {}",
            format.width,
            format.height,
            format.fourcc
        );

        // Frames are written straight to the device file
        let file = File::options()
            .write(true)
            .open(path)
            .with_context(|| format!("Failed to open v4l2loopback device at {}", path.display()))?;

        Ok(Self {
            file,
            width,
            height,
            yuyv: Vec::with_capacity((width * height * 2) as usize),
        })
    }
}

/// Pack an RGB frame as YUYV (YUV 4:2:2), averaging chroma over pixel pairs
fn rgb_to_yuyv(rgb_image: &RgbImage, yuyv: &mut Vec<u8>) {
    let (width, height) = rgb_image.dimensions();
    yuyv.clear();
    yuyv.reserve((width.div_ceil(2) * 4 * height) as usize);

    for row in rgb_image.rows() {
        let pixels: Vec<&Rgb<u8>> = row.collect();
        for pair in pixels.chunks(2) {
            let left = pair[0];
            let right = pair.get(1).copied().unwrap_or(left);

            let [y0, u0, v0] = bt601(left);
            let [y1, u1, v1] = bt601(right);

            // Y0 U Y1 V
            yuyv.extend_from_slice(&[
                clamp_u8(y0),
                clamp_u8((u0 + u1 + 1) >> 1),
                clamp_u8(y1),
                clamp_u8((v0 + v1 + 1) >> 1),
            ]);
        }
    }
}

/// Full-range BT.601 in 8-bit fixed point, chroma centred on 128
fn bt601(px: &Rgb<u8>) -> [i32; 3] {
    let [r, g, b] = px.0.map(i32::from);
    [
        (77 * r + 150 * g + 29 * b + 128) >> 8,
        ((-43 * r - 85 * g + 128 * b + 128) >> 8) + 128,
        ((128 * r - 107 * g - 21 * b + 128) >> 8) + 128,
    ]
}

fn clamp_u8(value: i32) -> u8 {
    value.clamp(0, 255) as u8
}

impl DisplaySurface for V4L2Output {
    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        if frame.dimensions() == (self.width, self.height) {
            rgb_to_yuyv(frame, &mut self.yuyv);
        } else {
            let resized = image::imageops::resize(
                frame,
                self.width,
                self.height,
                image::imageops::FilterType::Lanczos3,
            );
            rgb_to_yuyv(&resized, &mut self.yuyv);
        }

        self.file
            .write_all(&self.yuyv)
            .context("Failed to write frame to v4l2loopback device")?;

        Ok(())
    }

    fn poll_key(&mut self, _wait: Duration) -> Result<Option<char>> {
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_layout() {
        let mut frame = RgbImage::from_pixel(3, 1, Rgb([255, 255, 255]));
        frame.put_pixel(2, 0, Rgb([0, 0, 0]));

        let mut yuyv = Vec::new();
        rgb_to_yuyv(&frame, &mut yuyv);

        // Odd widths repeat the last pixel to fill the pair
        assert_eq!(yuyv, vec![255, 128, 255, 128, 0, 128, 0, 128]);
    }

    #[test]
    fn test_grey_has_neutral_chroma() {
        assert_eq!(bt601(&Rgb([128, 128, 128])), [128, 128, 128]);
    }

    #[test]
    fn test_primary_chroma() {
        let [_, u, v] = bt601(&Rgb([255, 0, 0]));
        assert!(u < 128 && v > 250);
        let [_, u, v] = bt601(&Rgb([0, 0, 255]));
        assert!(u > 250 && v < 128);
    }
}
