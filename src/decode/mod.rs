mod rqrr_decoder;

pub use rqrr_decoder::RqrrDecoder;

use anyhow::Result;
use image::RgbImage;
use std::fmt;

/// Axis-aligned rectangle in frame coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Smallest rectangle enclosing all points, `None` for an empty slice
    pub fn bounding(points: &[(i32, i32)]) -> Option<Self> {
        let (first, rest) = points.split_first()?;
        let (mut min_x, mut min_y) = *first;
        let (mut max_x, mut max_y) = *first;
        for &(x, y) in rest {
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }
        Some(Self::new(
            min_x,
            min_y,
            max_x.abs_diff(min_x),
            max_y.abs_diff(min_y),
        ))
    }

    /// Bottom-right corner, `(x + width, y + height)`
    pub fn far_corner(&self) -> (i32, i32) {
        (
            self.x.saturating_add_unsigned(self.width),
            self.y.saturating_add_unsigned(self.height),
        )
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "({}, {}, {}x{})",
            self.x, self.y, self.width, self.height
        )
    }
}

/// One QR code found in a frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detection {
    pub rect: Rect,
    /// Raw payload bytes, expected to be UTF-8 text
    pub payload: Vec<u8>,
}

impl Detection {
    pub fn new(rect: Rect, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            rect,
            payload: payload.into(),
        }
    }
}

/// Trait for QR decoding backends
/// Allows swapping the decoding library without touching the scan loop
pub trait Decoder {
    /// Locate and decode every QR code in a frame
    ///
    /// Detections are returned in a stable order for a given frame.
    fn decode(&mut self, frame: &RgbImage) -> Result<Vec<Detection>>;
}

impl<D: Decoder + ?Sized> Decoder for Box<D> {
    fn decode(&mut self, frame: &RgbImage) -> Result<Vec<Detection>> {
        (**self).decode(frame)
    }
}
