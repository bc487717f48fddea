use anyhow::Result;

use super::{DisplayEvent, FrameDisplay};
use crate::frame::Frame;

/// Discards frames; never asks the loop to stop.
#[derive(Debug, Default)]
pub struct HeadlessDisplay {
    frames_shown: u64,
}

impl HeadlessDisplay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames_shown(&self) -> u64 {
        self.frames_shown
    }
}

impl FrameDisplay for HeadlessDisplay {
    fn show(&mut self, _frame: &Frame) -> Result<DisplayEvent> {
        self.frames_shown += 1;
        Ok(DisplayEvent::Continue)
    }
}
