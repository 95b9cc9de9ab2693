use super::{Decoder, Detection, Rect};
use anyhow::Result;
use image::RgbImage;

/// QR decoder backed by the `rqrr` crate
#[derive(Debug, Default)]
pub struct RqrrDecoder;

impl RqrrDecoder {
    pub fn new() -> Self {
        Self
    }
}

impl Decoder for RqrrDecoder {
    fn decode(&mut self, frame: &RgbImage) -> Result<Vec<Detection>> {
        let _span = tracing::debug_span!("rqrr_decode").entered();

        let luma = image::imageops::grayscale(frame);
        let (width, height) = luma.dimensions();
        if width == 0 || height == 0 {
            return Ok(Vec::new());
        }

        let mut prepared =
            rqrr::PreparedImage::prepare_from_greyscale(width as usize, height as usize, |x, y| {
                luma.get_pixel(x as u32, y as u32)[0]
            });

        let grids = prepared.detect_grids();
        let mut detections = Vec::with_capacity(grids.len());

        for grid in grids {
            let corners: Vec<(i32, i32)> = grid.bounds.iter().map(|p| (p.x, p.y)).collect();
            let Some(rect) = Rect::bounding(&corners) else {
                continue;
            };

            // Located but undecodable grids are dropped; only readable codes count
            let mut payload = Vec::new();
            match grid.decode_to(&mut payload) {
                Ok(meta) => {
                    tracing::debug!(
                        "Decoded grid at {}: version={}, ecc={}, mask={}, {} bytes",
                        rect,
                        meta.version.0,
                        meta.ecc_level,
                        meta.mask,
                        payload.len()
                    );
                    detections.push(Detection { rect, payload });
                }
                Err(e) => {
                    tracing::debug!("Skipping grid at {}: {}", rect, e);
                }
            }
        }

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    // Version 1-M symbol for "4376471154038"
    const GOLDEN: [&str; 21] = [
        "#######.....#.#######",
        "#.....#..#....#.....#",
        "#.###.#...##..#.###.#",
        "#.###.#...#...#.###.#",
        "#.###.#..####.#.###.#",
        "#.....#.#.#...#.....#",
        "#######.#.#.#.#######",
        ".........#...........",
        "#..#.##.######.#.....",
        "###.#..##..#.#.#.##..",
        "#..#.####.##..###...#",
        "..#.#..#....#####....",
        "..#...##.#.#.###.##..",
        "........#.#..####.##.",
        "#######...###.#.####.",
        "#.....#.#.....##....#",
        "#.###.#..##.###..#.##",
        "#.###.#.#.#..####..##",
        "#.###.#..###.###.#..#",
        "#.....#..####..##..#.",
        "#######.###..#.###...",
    ];

    const MODULE_PX: u32 = 6;
    const QUIET_MODULES: u32 = 4;

    fn render_golden() -> RgbImage {
        let side = (21 + 2 * QUIET_MODULES) * MODULE_PX;
        RgbImage::from_fn(side, side, |x, y| {
            let mx = (x / MODULE_PX) as i64 - QUIET_MODULES as i64;
            let my = (y / MODULE_PX) as i64 - QUIET_MODULES as i64;
            let dark = (0..21).contains(&mx)
                && (0..21).contains(&my)
                && GOLDEN[my as usize].as_bytes()[mx as usize] == b'#';
            if dark {
                Rgb([0, 0, 0])
            } else {
                Rgb([255, 255, 255])
            }
        })
    }

    #[test]
    fn test_decodes_rendered_symbol() {
        let frame = render_golden();
        let detections = RqrrDecoder::new().decode(&frame).unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].payload, b"4376471154038");

        // The rectangle must sit around the symbol, inside the frame
        let rect = detections[0].rect;
        let symbol_start = (QUIET_MODULES * MODULE_PX) as i32;
        let symbol_end = ((QUIET_MODULES + 21) * MODULE_PX) as i32;
        assert!(rect.x >= symbol_start - MODULE_PX as i32 && rect.x <= symbol_start + MODULE_PX as i32);
        assert!(rect.y >= symbol_start - MODULE_PX as i32 && rect.y <= symbol_start + MODULE_PX as i32);
        let (far_x, far_y) = rect.far_corner();
        assert!(far_x >= symbol_end - 2 * MODULE_PX as i32 && far_x <= symbol_end + MODULE_PX as i32);
        assert!(far_y >= symbol_end - 2 * MODULE_PX as i32 && far_y <= symbol_end + MODULE_PX as i32);
    }

    #[test]
    fn test_decoding_is_repeatable() {
        let frame = render_golden();
        let mut decoder = RqrrDecoder::new();

        let first = decoder.decode(&frame).unwrap();
        let second = decoder.decode(&frame).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn test_blank_frame_has_no_detections() {
        let frame = RgbImage::from_pixel(160, 120, Rgb([255, 255, 255]));
        let detections = RqrrDecoder::new().decode(&frame).unwrap();
        assert!(detections.is_empty());
    }

    #[test]
    fn test_empty_frame() {
        let frame = RgbImage::new(0, 0);
        let detections = RqrrDecoder::new().decode(&frame).unwrap();
        assert!(detections.is_empty());
    }
}
