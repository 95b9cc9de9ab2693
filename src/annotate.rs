use crate::decode::Rect;
use crate::error::ScanError;
use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use std::path::Path;

/// DejaVu Sans Mono, see `assets/fonts/LICENSE-DejaVu.txt`
const BUNDLED_FONT: &[u8] = include_bytes!("../assets/fonts/DejaVuSansMono.ttf");

pub const DEFAULT_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const DEFAULT_THICKNESS: u32 = 2;
pub const DEFAULT_LABEL_OFFSET: i32 = 10;
pub const DEFAULT_FONT_SCALE: f32 = 16.0;

/// Draws detection outlines and payload labels onto frames
pub struct Annotator {
    color: Rgb<u8>,
    thickness: u32,
    label_offset: i32,
    scale: f32,
    font: FontArc,
}

impl Annotator {
    /// Annotator labelling with the bundled font
    pub fn new() -> Result<Self, ScanError> {
        let font = FontArc::try_from_slice(BUNDLED_FONT).map_err(|source| ScanError::FontParse {
            path: "<bundled DejaVuSansMono.ttf>".to_string(),
            source,
        })?;
        Ok(Self::with_font(font))
    }

    pub fn with_font(font: FontArc) -> Self {
        Self {
            color: DEFAULT_COLOR,
            thickness: DEFAULT_THICKNESS,
            label_offset: DEFAULT_LABEL_OFFSET,
            scale: DEFAULT_FONT_SCALE,
            font,
        }
    }

    /// Baseline-left point of the label for a detection rectangle
    pub fn label_anchor(&self, rect: Rect) -> (i32, i32) {
        (rect.x, rect.y.saturating_sub(self.label_offset))
    }

    /// Draw the outline of `rect` and `text` above it
    pub fn draw(&self, frame: &mut RgbImage, rect: Rect, text: &str) {
        self.draw_outline(frame, rect);
        self.draw_label(frame, rect, text);
    }

    /// Outline from `(x, y)` through `(x + width, y + height)` inclusive
    ///
    /// Grows inward with the thickness. Anything off-frame is clipped.
    pub fn draw_outline(&self, frame: &mut RgbImage, rect: Rect) {
        let outer_w = i64::from(rect.width) + 1;
        let outer_h = i64::from(rect.height) + 1;

        for ring in 0..i64::from(self.thickness) {
            let w = outer_w - 2 * ring;
            let h = outer_h - 2 * ring;
            if w <= 0 || h <= 0 {
                break;
            }
            let ring_rect = imageproc::rect::Rect::at(
                (i64::from(rect.x) + ring) as i32,
                (i64::from(rect.y) + ring) as i32,
            )
            .of_size(w as u32, h as u32);
            draw_hollow_rect_mut(frame, ring_rect, self.color);
        }
    }

    /// Text whose baseline starts at `label_anchor(rect)`
    ///
    /// The glyph box is kept below the top edge of the frame.
    pub fn draw_label(&self, frame: &mut RgbImage, rect: Rect, text: &str) {
        if text.is_empty() {
            return;
        }
        let (x, baseline) = self.label_anchor(rect);
        let top = (baseline - self.scale.ceil() as i32).max(0);
        draw_text_mut(
            frame,
            self.color,
            x,
            top,
            PxScale::from(self.scale),
            &self.font,
            text,
        );
    }
}

/// Load a TrueType/OpenType font file to replace the bundled one
pub fn load_font(path: &Path) -> Result<FontArc, ScanError> {
    let bytes = std::fs::read(path).map_err(|source| ScanError::FontIo {
        path: path.display().to_string(),
        source,
    })?;
    FontArc::try_from_vec(bytes).map_err(|source| ScanError::FontParse {
        path: path.display().to_string(),
        source,
    })
}
