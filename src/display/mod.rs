//! Preview output for annotated frames.

mod headless;
#[cfg(feature = "display-window")]
mod window;

use anyhow::Result;

use crate::config::DisplaySettings;
use crate::frame::Frame;

pub use headless::HeadlessDisplay;
#[cfg(feature = "display-window")]
pub use window::WindowDisplay;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisplayEvent {
    Continue,
    /// The operator asked to stop (quit key or window closed).
    Quit,
}

pub trait FrameDisplay {
    fn show(&mut self, frame: &Frame) -> Result<DisplayEvent>;
}

/// Open the configured display for frames of `width`×`height`.
pub fn open_display(
    settings: &DisplaySettings,
    width: u32,
    height: u32,
) -> Result<Box<dyn FrameDisplay>> {
    if !settings.enabled {
        return Ok(Box::new(HeadlessDisplay::new()));
    }
    open_window(settings, width, height)
}

#[cfg(feature = "display-window")]
fn open_window(
    settings: &DisplaySettings,
    width: u32,
    height: u32,
) -> Result<Box<dyn FrameDisplay>> {
    Ok(Box::new(WindowDisplay::new(&settings.title, width, height)?))
}

#[cfg(not(feature = "display-window"))]
fn open_window(
    settings: &DisplaySettings,
    _width: u32,
    _height: u32,
) -> Result<Box<dyn FrameDisplay>> {
    log::warn!(
        "display '{}' requested but built without the display-window feature; running headless",
        settings.title
    );
    Ok(Box::new(HeadlessDisplay::new()))
}
