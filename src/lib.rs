//! Person-following camera rig controller.
//!
//! Reads frames from a camera, detects people, and steers a motorized base
//! over a serial link so the followed person stays near the horizontal
//! center of the frame.
//!
//! # Per-frame contract
//!
//! 1. Read a frame. A failed read ends the stream.
//! 2. Run the detector with the configured confidence and IoU thresholds.
//! 3. Pick the deciding target detection (last one wins by default).
//! 4. Classify its horizontal center against the center band:
//!    left of `width/2 - band` is LEFT, right of `width/2 + band` is RIGHT,
//!    anything else, including no target, is STOP.
//! 5. Send exactly one command byte (`L`, `R`, `S`).
//! 6. Overlay the detections and show the frame; `q` quits.
//!
//! # Module Structure
//!
//! - `config`: JSON file + environment configuration
//! - `ingest`: camera sources (V4L2, synthetic `stub://`)
//! - `detect`: detector backends, YOLO decoding, NMS
//! - `policy`: commands and the decision rule
//! - `transport`: serial and in-memory command sinks
//! - `overlay` / `display`: visual feedback
//! - `follower`: the decision loop
//! - `ui`: startup stage reporting

pub mod config;
pub mod detect;
pub mod display;
pub mod follower;
pub mod frame;
pub mod ingest;
pub mod overlay;
pub mod policy;
pub mod transport;
pub mod ui;

pub use config::FollowerConfig;
pub use detect::{build_backend, BoundingBox, Detection, DetectionThresholds, DetectorBackend};
pub use display::{open_display, DisplayEvent, FrameDisplay, HeadlessDisplay};
pub use follower::{CommandCounts, ExitReason, Follower, RunSummary, StepOutcome};
pub use frame::Frame;
pub use ingest::{open_camera, CameraSource, FrameSource, SourceStats};
pub use policy::{classify, decide, Command, Decision, PolicySettings, SelectionPolicy};
pub use transport::{open_sink, CommandLog, CommandSink, MemorySink, SerialSink};
