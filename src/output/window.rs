use super::{DisplaySurface, ESCAPE};
use anyhow::{anyhow, Result};
use image::RgbImage;
use minifb::{Key, KeyRepeat, Window, WindowOptions};
use std::time::Duration;

/// Desktop preview window
///
/// The window is created on the first frame, sized to that frame.
pub struct PreviewWindow {
    title: String,
    window: Option<Window>,
    buffer: Vec<u32>,
}

impl PreviewWindow {
    pub fn new(title: &str) -> Self {
        Self {
            title: title.to_string(),
            window: None,
            buffer: Vec::new(),
        }
    }

    fn pressed_key(window: &Window) -> Option<char> {
        window
            .get_keys_pressed(KeyRepeat::No)
            .into_iter()
            .find_map(key_to_char)
    }
}

impl DisplaySurface for PreviewWindow {
    fn show(&mut self, frame: &RgbImage) -> Result<()> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Ok(());
        }

        // minifb wants 0RGB packed into u32
        self.buffer.clear();
        self.buffer.extend(
            frame
                .pixels()
                .map(|p| (u32::from(p[0]) << 16) | (u32::from(p[1]) << 8) | u32::from(p[2])),
        );

        if self.window.is_none() {
            tracing::info!("Opening preview window '{}' at {}x{}", self.title, width, height);
            let window = Window::new(
                &self.title,
                width as usize,
                height as usize,
                WindowOptions {
                    resize: true,
                    ..WindowOptions::default()
                },
            )
            .map_err(|e| anyhow!("Failed to open preview window: {}", e))?;
            self.window = Some(window);
        }

        if let Some(window) = &mut self.window {
            window
                .update_with_buffer(&self.buffer, width as usize, height as usize)
                .map_err(|e| anyhow!("Failed to update preview window: {}", e))?;
        }

        Ok(())
    }

    fn poll_key(&mut self, wait: Duration) -> Result<Option<char>> {
        let Some(window) = &mut self.window else {
            std::thread::sleep(wait);
            return Ok(None);
        };

        // Keys may already have arrived with the last frame update
        if let Some(key) = Self::pressed_key(window) {
            return Ok(Some(key));
        }

        std::thread::sleep(wait);
        window.update();
        Ok(Self::pressed_key(window))
    }

    fn is_open(&self) -> bool {
        self.window.as_ref().map_or(true, |window| window.is_open())
    }
}

fn key_to_char(key: Key) -> Option<char> {
    let c = match key {
        Key::A => 'a',
        Key::B => 'b',
        Key::C => 'c',
        Key::D => 'd',
        Key::E => 'e',
        Key::F => 'f',
        Key::G => 'g',
        Key::H => 'h',
        Key::I => 'i',
        Key::J => 'j',
        Key::K => 'k',
        Key::L => 'l',
        Key::M => 'm',
        Key::N => 'n',
        Key::O => 'o',
        Key::P => 'p',
        Key::Q => 'q',
        Key::R => 'r',
        Key::S => 's',
        Key::T => 't',
        Key::U => 'u',
        Key::V => 'v',
        Key::W => 'w',
        Key::X => 'x',
        Key::Y => 'y',
        Key::Z => 'z',
        Key::Key0 | Key::NumPad0 => '0',
        Key::Key1 | Key::NumPad1 => '1',
        Key::Key2 | Key::NumPad2 => '2',
        Key::Key3 | Key::NumPad3 => '3',
        Key::Key4 | Key::NumPad4 => '4',
        Key::Key5 | Key::NumPad5 => '5',
        Key::Key6 | Key::NumPad6 => '6',
        Key::Key7 | Key::NumPad7 => '7',
        Key::Key8 | Key::NumPad8 => '8',
        Key::Key9 | Key::NumPad9 => '9',
        Key::Space => ' ',
        Key::Escape => ESCAPE,
        _ => return None,
    };
    Some(c)
}
