use super::DisplaySurface;
use anyhow::{Context, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Saves every presented frame as a numbered PNG
pub struct SnapshotDir {
    dir: PathBuf,
    written: u64,
}

impl SnapshotDir {
    pub fn new<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create snapshot directory {}", dir.display()))?;

        tracing::info!("Saving annotated frames to {}", dir.display());

        Ok(Self { dir, written: 0 })
    }

    pub fn written(&self) -> u64 {
        self.written
    }
}

impl DisplaySurface for SnapshotDir {
    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        let path = self.dir.join(format!("frame_{:06}.png", self.written + 1));
        frame
            .save(&path)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        self.written += 1;
        Ok(())
    }

    fn poll_key(&mut self, wait: Duration) -> Result<Option<char>> {
        std::thread::sleep(wait);
        Ok(None)
    }
}
