//! Camera frame sources.
//!
//! - USB/V4L2 devices (feature: ingest-v4l2)
//! - Synthetic `stub://` scene (testing, demos)
//!
//! Every source yields RGB24 `Frame`s. A read error means the stream has
//! ended; the loop does not retry.

mod normalize;
pub mod synthetic;
#[cfg(feature = "ingest-v4l2")]
pub mod v4l2;

use anyhow::Result;

use crate::config::CameraSettings;
use crate::frame::Frame;

pub use normalize::{normalize_to_rgb, PixelFormat};
pub use synthetic::SyntheticSource;
#[cfg(feature = "ingest-v4l2")]
pub use v4l2::V4l2Source;

/// Device prefix selecting the synthetic scene.
pub const STUB_PREFIX: &str = "stub://";

pub trait FrameSource {
    fn name(&self) -> &str;

    fn connect(&mut self) -> Result<()>;

    /// Block until the next frame is available.
    fn next_frame(&mut self) -> Result<Frame>;

    fn is_healthy(&self) -> bool {
        true
    }

    fn stats(&self) -> SourceStats;
}

#[derive(Clone, Debug)]
pub struct SourceStats {
    pub frames_captured: u64,
    pub device: String,
}

/// Camera selected by device path.
pub struct CameraSource {
    backend: CameraBackend,
}

enum CameraBackend {
    Synthetic(SyntheticSource),
    #[cfg(feature = "ingest-v4l2")]
    Device(V4l2Source),
}

impl CameraSource {
    pub fn new(config: CameraSettings) -> Result<Self> {
        if config.device.starts_with(STUB_PREFIX) {
            return Ok(Self {
                backend: CameraBackend::Synthetic(SyntheticSource::new(config)),
            });
        }
        Self::device(config)
    }

    #[cfg(feature = "ingest-v4l2")]
    fn device(config: CameraSettings) -> Result<Self> {
        Ok(Self {
            backend: CameraBackend::Device(V4l2Source::new(config)),
        })
    }

    #[cfg(not(feature = "ingest-v4l2"))]
    fn device(config: CameraSettings) -> Result<Self> {
        Err(anyhow::anyhow!(
            "camera {} requires the ingest-v4l2 feature (use {}<name> for the synthetic scene)",
            config.device,
            STUB_PREFIX
        ))
    }

    fn inner(&self) -> &dyn FrameSource {
        match &self.backend {
            CameraBackend::Synthetic(source) => source,
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source,
        }
    }

    fn inner_mut(&mut self) -> &mut dyn FrameSource {
        match &mut self.backend {
            CameraBackend::Synthetic(source) => source,
            #[cfg(feature = "ingest-v4l2")]
            CameraBackend::Device(source) => source,
        }
    }
}

impl FrameSource for CameraSource {
    fn name(&self) -> &str {
        self.inner().name()
    }

    fn connect(&mut self) -> Result<()> {
        self.inner_mut().connect()
    }

    fn next_frame(&mut self) -> Result<Frame> {
        self.inner_mut().next_frame()
    }

    fn is_healthy(&self) -> bool {
        self.inner().is_healthy()
    }

    fn stats(&self) -> SourceStats {
        self.inner().stats()
    }
}

/// Build and connect the configured camera.
pub fn open_camera(settings: &CameraSettings) -> Result<CameraSource> {
    let mut source = CameraSource::new(settings.clone())?;
    source.connect()?;
    Ok(source)
}
