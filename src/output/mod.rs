#[cfg(all(feature = "loopback", target_os = "linux"))]
mod loopback;
mod snapshot;
#[cfg(feature = "window")]
mod window;

#[cfg(all(feature = "loopback", target_os = "linux"))]
pub use loopback::V4L2Output;
pub use snapshot::SnapshotDir;
#[cfg(feature = "window")]
pub use window::PreviewWindow;

use anyhow::Result;
use image::RgbImage;
use std::time::Duration;

/// Escape, as reported by `poll_key`
pub const ESCAPE: char = '\u{1b}';

/// Trait for display surfaces
pub trait DisplaySurface {
    /// Present an annotated frame
    fn show(&mut self, frame: &RgbImage) -> Result<()>;

    /// Wait up to `wait` for a key press
    fn poll_key(&mut self, wait: Duration) -> Result<Option<char>>;

    /// Whether the surface can still present frames
    fn is_open(&self) -> bool {
        true
    }
}

/// Surface that discards frames and never reports keys
#[derive(Debug, Default)]
pub struct Headless;

impl DisplaySurface for Headless {
    fn show(&mut self, _frame: &RgbImage) -> Result<()> {
        Ok(())
    }

    fn poll_key(&mut self, wait: Duration) -> Result<Option<char>> {
        std::thread::sleep(wait);
        Ok(None)
    }
}

impl<D: DisplaySurface + ?Sized> DisplaySurface for Box<D> {
    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        (**self).show(frame)
    }

    fn poll_key(&mut self, wait: Duration) -> Result<Option<char>> {
        (**self).poll_key(wait)
    }

    fn is_open(&self) -> bool {
        (**self).is_open()
    }
}

/// Fan-out to several surfaces; only the first one waits for keys
impl DisplaySurface for Vec<Box<dyn DisplaySurface>> {
    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        for surface in self.iter_mut() {
            surface.show(frame)?;
        }
        Ok(())
    }

    fn poll_key(&mut self, wait: Duration) -> Result<Option<char>> {
        let mut wait = wait;
        for surface in self.iter_mut() {
            if let Some(key) = surface.poll_key(wait)? {
                return Ok(Some(key));
            }
            wait = Duration::ZERO;
        }
        Ok(None)
    }

    fn is_open(&self) -> bool {
        self.iter().all(|surface| surface.is_open())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    struct Recorder {
        key: Option<char>,
        open: bool,
        waits: Rc<RefCell<Vec<Duration>>>,
        shown: Rc<RefCell<usize>>,
    }

    impl DisplaySurface for Recorder {
        fn show(&mut self, _frame: &RgbImage) -> Result<()> {
            *self.shown.borrow_mut() += 1;
            Ok(())
        }

        fn poll_key(&mut self, wait: Duration) -> Result<Option<char>> {
            self.waits.borrow_mut().push(wait);
            Ok(self.key)
        }

        fn is_open(&self) -> bool {
            self.open
        }
    }

    #[test]
    fn test_fan_out() {
        let waits = Rc::new(RefCell::new(Vec::new()));
        let shown = Rc::new(RefCell::new(0));
        let recorder = |key, open| -> Box<dyn DisplaySurface> {
            Box::new(Recorder {
                key,
                open,
                waits: waits.clone(),
                shown: shown.clone(),
            })
        };

        let mut surfaces: Vec<Box<dyn DisplaySurface>> =
            vec![recorder(None, true), recorder(Some('q'), true), recorder(Some('x'), false)];

        surfaces.show(&RgbImage::new(2, 2)).unwrap();
        assert_eq!(*shown.borrow(), 3);

        let key = surfaces.poll_key(Duration::from_millis(1)).unwrap();
        assert_eq!(key, Some('q'));
        assert_eq!(
            *waits.borrow(),
            vec![Duration::from_millis(1), Duration::ZERO]
        );

        assert!(!surfaces.is_open());
    }

    #[test]
    fn test_headless() {
        let mut display = Headless;
        display.show(&RgbImage::new(2, 2)).unwrap();
        assert_eq!(display.poll_key(Duration::from_millis(1)).unwrap(), None);
        assert!(display.is_open());
    }

    #[test]
    fn test_headless_waits_for_key_timeout() {
        let mut display = Headless;
        let start = std::time::Instant::now();
        assert_eq!(display.poll_key(Duration::from_millis(20)).unwrap(), None);
        assert!(start.elapsed() >= Duration::from_millis(20));
    }
}
