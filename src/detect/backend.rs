use anyhow::Result;

use crate::detect::result::{Detection, DetectionThresholds};
use crate::frame::Frame;

/// Detector backend trait.
///
/// A backend turns one frame into labeled boxes in frame pixel coordinates.
/// The returned order is the backend's native order; the decision policy relies
/// on it, so backends must not reorder between identical calls.
pub trait DetectorBackend: Send {
    /// Backend identifier, as used in configuration.
    fn name(&self) -> &'static str;

    /// Run detection on a frame.
    ///
    /// Implementations treat the frame as read-only and must not keep it past the call.
    fn detect(&mut self, frame: &Frame, thresholds: &DetectionThresholds)
        -> Result<Vec<Detection>>;

    /// Optional warm-up hook, called once before the first frame.
    fn warm_up(&mut self) -> Result<()> {
        Ok(())
    }
}
