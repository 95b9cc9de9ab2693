use super::FrameSource;
use anyhow::{bail, Context, Result};
use image::RgbImage;
use std::collections::VecDeque;
use std::path::{Path, PathBuf};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "bmp", "gif", "webp", "tif", "tiff"];

/// Frames read from still images, one file per frame
///
/// Useful for replaying captured frames without a camera attached.
pub struct ImageSequence {
    pending: VecDeque<PathBuf>,
    width: u32,
    height: u32,
}

impl ImageSequence {
    /// Open a single image file, or every image file in a directory sorted by name
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let files = if path.is_dir() {
            let mut files = Vec::new();
            for entry in std::fs::read_dir(path)
                .with_context(|| format!("Failed to read directory {}", path.display()))?
            {
                let entry = entry?;
                let file = entry.path();
                if file.is_file() && is_image(&file) {
                    files.push(file);
                }
            }
            files.sort();
            if files.is_empty() {
                bail!("No image files found in {}", path.display());
            }
            files
        } else if path.is_file() {
            vec![path.to_path_buf()]
        } else {
            bail!("Input {} does not exist", path.display());
        };

        tracing::info!("Reading {} frame(s) from {}", files.len(), path.display());

        // Resolution comes from the first frame header
        let (width, height) = image::image_dimensions(&files[0])
            .with_context(|| format!("Failed to read {}", files[0].display()))?;

        Ok(Self {
            pending: files.into(),
            width,
            height,
        })
    }

    /// Frames not yet read
    pub fn remaining(&self) -> usize {
        self.pending.len()
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

impl FrameSource for ImageSequence {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let Some(path) = self.pending.pop_front() else {
            return Ok(None);
        };

        tracing::debug!("Loading frame {}", path.display());
        let frame = image::open(&path)
            .with_context(|| format!("Failed to load {}", path.display()))?
            .to_rgb8();

        Ok(Some(frame))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
