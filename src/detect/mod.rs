//! Object detection.
//!
//! - `DetectorBackend`: the seam between the loop and an inference engine.
//! - `yolo`: letterbox preprocessing and YOLOv8 output decoding.
//! - `backends`: the stub backend and, with `backend-tract`, ONNX inference.

mod backend;
pub mod backends;
mod nms;
mod result;
pub mod yolo;

use anyhow::{anyhow, Result};

use crate::config::DetectorSettings;

pub use backend::DetectorBackend;
pub use backends::StubBackend;
#[cfg(feature = "backend-tract")]
pub use backends::TractBackend;
pub use nms::non_max_suppression;
pub use result::{BoundingBox, Detection, DetectionThresholds};

/// Backend names accepted in configuration.
pub const BACKEND_NAMES: [&str; 2] = ["stub", "tract"];

/// Build the configured backend. The model artifact is loaded here, once.
pub fn build_backend(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    match settings.backend.as_str() {
        "stub" => Ok(Box::new(StubBackend::new())),
        "tract" => build_tract(settings),
        other => Err(anyhow!(
            "unknown detector backend '{}' (expected one of {:?})",
            other,
            BACKEND_NAMES
        )),
    }
}

#[cfg(feature = "backend-tract")]
fn build_tract(settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    log::info!(
        "loading ONNX model {} ({}x{} input, cpu)",
        settings.model_path.display(),
        settings.input_size,
        settings.input_size
    );
    Ok(Box::new(TractBackend::new(
        &settings.model_path,
        settings.input_size,
    )?))
}

#[cfg(not(feature = "backend-tract"))]
fn build_tract(_settings: &DetectorSettings) -> Result<Box<dyn DetectorBackend>> {
    Err(anyhow!(
        "detector backend 'tract' requires the backend-tract feature"
    ))
}
