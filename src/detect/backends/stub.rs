use anyhow::Result;

use crate::detect::backend::DetectorBackend;
use crate::detect::result::{BoundingBox, Detection, DetectionThresholds};
use crate::frame::Frame;

/// Channel value above which a pixel counts as part of the synthetic figure.
const FIGURE_MIN_LEVEL: u8 = 240;

/// Confidence reported for the synthetic figure.
const STUB_CONFIDENCE: f32 = 0.9;

/// Stub backend for running without a model.
///
/// Treats the bounding box of all near-white pixels as one `person`. Paired with
/// the synthetic camera this exercises the full loop without hardware.
pub struct StubBackend {
    label: String,
}

impl StubBackend {
    pub fn new() -> Self {
        Self {
            label: "person".to_string(),
        }
    }

    /// Report the figure under a different label.
    pub fn with_label(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }
}

impl Default for StubBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl DetectorBackend for StubBackend {
    fn name(&self) -> &'static str {
        "stub"
    }

    fn detect(
        &mut self,
        frame: &Frame,
        thresholds: &DetectionThresholds,
    ) -> Result<Vec<Detection>> {
        if STUB_CONFIDENCE <= thresholds.confidence {
            return Ok(vec![]);
        }

        let width = frame.width as usize;
        let mut bounds: Option<(usize, usize, usize, usize)> = None;
        for (i, px) in frame.pixels().chunks_exact(3).enumerate() {
            if px.iter().all(|&c| c >= FIGURE_MIN_LEVEL) {
                let (x, y) = (i % width, i / width);
                bounds = Some(match bounds {
                    None => (x, y, x, y),
                    Some((x1, y1, x2, y2)) => (x1.min(x), y1.min(y), x2.max(x), y2.max(y)),
                });
            }
        }

        Ok(bounds
            .map(|(x1, y1, x2, y2)| {
                Detection::new(
                    self.label.clone(),
                    STUB_CONFIDENCE,
                    BoundingBox::new(x1 as f32, y1 as f32, (x2 + 1) as f32, (y2 + 1) as f32),
                )
            })
            .into_iter()
            .collect())
    }
}
