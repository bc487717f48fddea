//! Frame container shared by ingestion, detection and display.
//!
//! - `Frame`: owned RGB24 pixel buffer plus dimensions and a capture sequence number.
//!
//! Every source normalizes its native pixel format to RGB24 before handing a
//! `Frame` to the loop, so detectors and overlays only deal with one layout.

use anyhow::{anyhow, Result};

/// Capture width requested from cameras unless configured otherwise.
pub const DEFAULT_FRAME_WIDTH: u32 = 640;

/// Capture height requested from cameras unless configured otherwise.
pub const DEFAULT_FRAME_HEIGHT: u32 = 480;

/// Bytes per pixel in the normalized layout.
pub const RGB_CHANNELS: usize = 3;

// ----------------------------------------------------------------------------
// Frame
// ----------------------------------------------------------------------------

/// One captured image in RGB24, row-major, no padding between rows.
///
/// A frame is owned by the loop iteration that read it and dropped once the
/// command for that iteration has been sent and the preview shown.
#[derive(Clone, Debug)]
pub struct Frame {
    data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Capture counter assigned by the source (starts at 1).
    pub sequence: u64,
}

impl Frame {
    /// Wrap an RGB24 buffer. Fails when the buffer length does not match the dimensions.
    pub fn new(data: Vec<u8>, width: u32, height: u32, sequence: u64) -> Result<Self> {
        let expected = rgb_len(width, height)?;
        if data.len() != expected {
            return Err(anyhow!(
                "frame buffer length mismatch: expected {} bytes for {}x{}, got {}",
                expected,
                width,
                height,
                data.len()
            ));
        }
        Ok(Self {
            data,
            width,
            height,
            sequence,
        })
    }

    /// Solid-color frame, mostly useful for tests and synthetic sources.
    pub fn filled(width: u32, height: u32, rgb: [u8; 3], sequence: u64) -> Result<Self> {
        let len = rgb_len(width, height)?;
        let data = rgb.iter().copied().cycle().take(len).collect();
        Self::new(data, width, height, sequence)
    }

    pub fn pixels(&self) -> &[u8] {
        &self.data
    }

    pub fn pixels_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    /// Horizontal midpoint in pixels.
    pub fn center_x(&self) -> f32 {
        self.width as f32 / 2.0
    }

    pub fn get_pixel(&self, x: u32, y: u32) -> Option<[u8; 3]> {
        let offset = self.offset(x, y)?;
        Some([
            self.data[offset],
            self.data[offset + 1],
            self.data[offset + 2],
        ])
    }

    /// Set one pixel. Coordinates outside the frame are ignored.
    pub fn put_pixel(&mut self, x: i64, y: i64, rgb: [u8; 3]) {
        if x < 0 || y < 0 {
            return;
        }
        if let Some(offset) = self.offset(x as u32, y as u32) {
            self.data[offset..offset + RGB_CHANNELS].copy_from_slice(&rgb);
        }
    }

    fn offset(&self, x: u32, y: u32) -> Option<usize> {
        if x >= self.width || y >= self.height {
            return None;
        }
        Some((y as usize * self.width as usize + x as usize) * RGB_CHANNELS)
    }
}

/// Byte length of an RGB24 buffer with the given dimensions.
pub fn rgb_len(width: u32, height: u32) -> Result<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(RGB_CHANNELS))
        .ok_or_else(|| anyhow!("frame dimensions overflow"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_rejects_mismatched_buffer() {
        let err = Frame::new(vec![0u8; 10], 2, 2, 1).unwrap_err();
        assert!(err.to_string().contains("length mismatch"));
    }

    #[test]
    fn put_pixel_ignores_out_of_bounds() -> Result<()> {
        let mut frame = Frame::filled(4, 3, [0, 0, 0], 1)?;
        frame.put_pixel(-1, 0, [255, 0, 0]);
        frame.put_pixel(4, 0, [255, 0, 0]);
        frame.put_pixel(0, 3, [255, 0, 0]);
        assert!(frame.pixels().iter().all(|&b| b == 0));

        frame.put_pixel(3, 2, [1, 2, 3]);
        assert_eq!(frame.get_pixel(3, 2), Some([1, 2, 3]));
        assert_eq!(frame.get_pixel(4, 2), None);
        Ok(())
    }

    #[test]
    fn center_is_half_width() -> Result<()> {
        let frame = Frame::filled(DEFAULT_FRAME_WIDTH, DEFAULT_FRAME_HEIGHT, [9, 9, 9], 1)?;
        assert_eq!(frame.center_x(), 320.0);
        Ok(())
    }
}
