use anyhow::{Context, Result};
use minifb::{Key, KeyRepeat, Window, WindowOptions};

use super::{DisplayEvent, FrameDisplay};
use crate::frame::Frame;

/// On-screen preview backed by a minifb window.
pub struct WindowDisplay {
    window: Window,
    buffer: Vec<u32>,
    width: usize,
    height: usize,
}

impl WindowDisplay {
    pub fn new(title: &str, width: u32, height: u32) -> Result<Self> {
        let (width, height) = (width as usize, height as usize);
        let window = Window::new(
            title,
            width,
            height,
            WindowOptions {
                resize: false,
                ..WindowOptions::default()
            },
        )
        .with_context(|| format!("failed to open display window '{}'", title))?;

        Ok(Self {
            window,
            buffer: vec![0u32; width * height],
            width,
            height,
        })
    }

    fn copy_frame(&mut self, frame: &Frame) {
        let frame_width = frame.width as usize;
        let rows = self.height.min(frame.height as usize);
        let cols = self.width.min(frame_width);
        let pixels = frame.pixels();
        for y in 0..rows {
            for x in 0..cols {
                let i = (y * frame_width + x) * 3;
                let r = pixels[i] as u32;
                let g = pixels[i + 1] as u32;
                let b = pixels[i + 2] as u32;
                self.buffer[y * self.width + x] = (r << 16) | (g << 8) | b;
            }
        }
    }
}

impl FrameDisplay for WindowDisplay {
    fn show(&mut self, frame: &Frame) -> Result<DisplayEvent> {
        if !self.window.is_open() {
            return Ok(DisplayEvent::Quit);
        }
        self.copy_frame(frame);
        self.window
            .update_with_buffer(&self.buffer, self.width, self.height)
            .context("failed to update display window")?;

        // A tap shorter than one inference pass is only visible as a press or release edge.
        let quit_key = self.window.is_key_down(Key::Q)
            || self.window.is_key_pressed(Key::Q, KeyRepeat::No)
            || self.window.is_key_released(Key::Q);
        Ok(quit_event(self.window.is_open(), quit_key))
    }
}

fn quit_event(window_open: bool, quit_key: bool) -> DisplayEvent {
    if !window_open || quit_key {
        DisplayEvent::Quit
    } else {
        DisplayEvent::Continue
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn closed_window_or_quit_key_ends_preview() {
        assert_eq!(quit_event(true, false), DisplayEvent::Continue);
        assert_eq!(quit_event(true, true), DisplayEvent::Quit);
        assert_eq!(quit_event(false, false), DisplayEvent::Quit);
    }
}
