use anyhow::{anyhow, Result};
use std::time::{Duration, Instant};

use super::{FrameSource, SourceStats};
use crate::config::CameraSettings;
use crate::frame::Frame;

const BACKGROUND: [u8; 3] = [30, 32, 40];
const FIGURE: [u8; 3] = [255, 255, 255];

/// Frames per one-way sweep of the figure across the frame.
const SWEEP_FRAMES: u64 = 90;

/// Every `EMPTY_EVERY`-th block of `EMPTY_BLOCK` frames shows no figure.
const EMPTY_BLOCK: u64 = 30;
const EMPTY_EVERY: u64 = 8;

/// Synthetic camera for `stub://` devices.
///
/// Renders a bright upright figure sweeping left and right over a dark
/// background, with periodic empty stretches.
pub struct SyntheticSource {
    config: CameraSettings,
    frame_count: u64,
    last_frame_at: Option<Instant>,
}

impl SyntheticSource {
    pub fn new(config: CameraSettings) -> Self {
        Self {
            config,
            frame_count: 0,
            last_frame_at: None,
        }
    }

    /// Horizontal center of the figure for a frame, or `None` when the scene is empty.
    pub fn figure_center(&self, frame_count: u64) -> Option<u32> {
        if (frame_count / EMPTY_BLOCK) % EMPTY_EVERY == EMPTY_EVERY - 1 {
            return None;
        }
        let half_width = self.figure_width() / 2;
        let travel = self.config.width.saturating_sub(self.figure_width()) as u64;
        let phase = frame_count % (2 * SWEEP_FRAMES);
        let progress = if phase < SWEEP_FRAMES {
            phase
        } else {
            2 * SWEEP_FRAMES - phase
        };
        Some(half_width + (travel * progress / SWEEP_FRAMES) as u32)
    }

    fn figure_width(&self) -> u32 {
        (self.config.width / 10).max(2)
    }

    fn render(&self, frame_count: u64) -> Result<Frame> {
        let mut frame = Frame::filled(
            self.config.width,
            self.config.height,
            BACKGROUND,
            frame_count,
        )?;
        if let Some(center) = self.figure_center(frame_count) {
            let half_width = (self.figure_width() / 2) as i64;
            let top = (self.config.height / 4) as i64;
            let bottom = (self.config.height - self.config.height / 8) as i64;
            for y in top..bottom {
                for x in (center as i64 - half_width)..(center as i64 + half_width) {
                    frame.put_pixel(x, y, FIGURE);
                }
            }
        }
        Ok(frame)
    }

    fn pace(&mut self) {
        if self.config.target_fps == 0 {
            return;
        }
        let period = Duration::from_secs(1) / self.config.target_fps;
        if let Some(last) = self.last_frame_at {
            let elapsed = last.elapsed();
            if elapsed < period {
                std::thread::sleep(period - elapsed);
            }
        }
        self.last_frame_at = Some(Instant::now());
    }
}

impl FrameSource for SyntheticSource {
    fn name(&self) -> &str {
        &self.config.device
    }

    /// Synthetic sources are always "connected".
    fn connect(&mut self) -> Result<()> {
        log::info!(
            "CameraSource: connected to {} (synthetic, {}x{})",
            self.config.device,
            self.config.width,
            self.config.height
        );
        Ok(())
    }

    fn next_frame(&mut self) -> Result<Frame> {
        if let Some(limit) = self.config.frame_limit {
            if self.frame_count >= limit {
                return Err(anyhow!(
                    "synthetic stream {} exhausted after {} frames",
                    self.config.device,
                    limit
                ));
            }
        }
        self.pace();
        self.frame_count += 1;
        self.render(self.frame_count)
    }

    fn stats(&self) -> SourceStats {
        SourceStats {
            frames_captured: self.frame_count,
            device: self.config.device.clone(),
        }
    }
}
