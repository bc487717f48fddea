//! Per-frame decision policy.
//!
//! Maps the current frame's detections to exactly one motor command. No state is
//! carried between frames.

use std::fmt;

use anyhow::{anyhow, Result};

use crate::detect::Detection;

/// Half-width of the centered band, in pixels, inside which the rig holds still.
pub const DEFAULT_CENTER_BAND_PX: f32 = 120.0;

/// Label the rig follows.
pub const DEFAULT_TARGET_LABEL: &str = "person";

/// Directional command understood by the motor controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Command {
    Left,
    Right,
    Stop,
}

impl Command {
    pub const ALL: [Command; 3] = [Command::Left, Command::Right, Command::Stop];

    /// Wire encoding: one ASCII byte.
    pub fn as_byte(self) -> u8 {
        match self {
            Command::Left => b'L',
            Command::Right => b'R',
            Command::Stop => b'S',
        }
    }

    pub fn from_byte(byte: u8) -> Result<Self> {
        match byte.to_ascii_uppercase() {
            b'L' => Ok(Command::Left),
            b'R' => Ok(Command::Right),
            b'S' => Ok(Command::Stop),
            other => Err(anyhow!(
                "unknown command byte {:?} (expected L, R or S)",
                other as char
            )),
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Command::Left => "left",
            Command::Right => "right",
            Command::Stop => "stop",
        };
        f.write_str(name)
    }
}

/// Which target detection decides the frame when several are present.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// The last target in the detector's native order wins.
    #[default]
    LastDetection,
    HighestConfidence,
    LargestArea,
}

impl SelectionPolicy {
    pub fn parse(value: &str) -> Result<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "last_detection" | "last" => Ok(SelectionPolicy::LastDetection),
            "highest_confidence" | "confidence" => Ok(SelectionPolicy::HighestConfidence),
            "largest_area" | "largest" => Ok(SelectionPolicy::LargestArea),
            other => Err(anyhow!(
                "unknown selection policy '{}' (expected last_detection, highest_confidence or largest_area)",
                other
            )),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct PolicySettings {
    pub target_label: String,
    pub center_band_px: f32,
    pub selection: SelectionPolicy,
}

impl Default for PolicySettings {
    fn default() -> Self {
        Self {
            target_label: DEFAULT_TARGET_LABEL.to_string(),
            center_band_px: DEFAULT_CENTER_BAND_PX,
            selection: SelectionPolicy::default(),
        }
    }
}

/// Outcome of one frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Decision {
    pub command: Command,
    /// Index into the detection slice of the detection that decided the frame.
    pub target: Option<usize>,
    /// Number of detections carrying the target label.
    pub candidates: usize,
}

/// Classify a horizontal position against the centered band.
///
/// Positions exactly on a band edge count as centered.
pub fn classify(center_x: f32, frame_width: u32, band: f32) -> Command {
    let mid = (frame_width / 2) as f32;
    if center_x < mid - band {
        Command::Left
    } else if center_x > mid + band {
        Command::Right
    } else {
        Command::Stop
    }
}

/// Decide the single command for a frame.
pub fn decide(detections: &[Detection], frame_width: u32, settings: &PolicySettings) -> Decision {
    let targets = detections
        .iter()
        .enumerate()
        .filter(|(_, d)| d.label == settings.target_label);

    let candidates = targets.clone().count();
    let chosen = match settings.selection {
        SelectionPolicy::LastDetection => targets.last(),
        // max_by keeps the last of equal elements; ties go to the later detection.
        SelectionPolicy::HighestConfidence => {
            targets.max_by(|(_, a), (_, b)| a.confidence.total_cmp(&b.confidence))
        }
        SelectionPolicy::LargestArea => {
            targets.max_by(|(_, a), (_, b)| a.bbox.area().total_cmp(&b.bbox.area()))
        }
    };

    match chosen {
        Some((index, detection)) => Decision {
            command: classify(
                detection.bbox.center_x_px() as f32,
                frame_width,
                settings.center_band_px,
            ),
            target: Some(index),
            candidates,
        },
        None => Decision {
            command: Command::Stop,
            target: None,
            candidates,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::BoundingBox;

    const WIDTH: u32 = 640;

    fn person_at(center_x: f32) -> Detection {
        Detection::new(
            "person",
            0.8,
            BoundingBox::new(center_x - 20.0, 100.0, center_x + 20.0, 300.0),
        )
    }

    #[test]
    fn no_detections_means_stop() {
        let decision = decide(&[], WIDTH, &PolicySettings::default());
        assert_eq!(decision.command, Command::Stop);
        assert_eq!(decision.target, None);
        assert_eq!(decision.candidates, 0);
    }

    #[test]
    fn non_target_labels_are_ignored() {
        let dog = Detection::new("dog", 0.99, BoundingBox::new(0.0, 0.0, 40.0, 40.0));
        let decision = decide(&[dog], WIDTH, &PolicySettings::default());
        assert_eq!(decision.command, Command::Stop);
        assert_eq!(decision.candidates, 0);
    }

    #[test]
    fn classification_around_center_band() {
        let settings = PolicySettings::default();
        let cases = [
            (320.0, Command::Stop),
            (320.0 - 121.0, Command::Left),
            (320.0 + 121.0, Command::Right),
            (320.0 - 119.0, Command::Stop),
            (320.0 + 119.0, Command::Stop),
            (320.0 - 120.0, Command::Stop),
            (320.0 + 120.0, Command::Stop),
        ];
        for (center_x, expected) in cases {
            let decision = decide(&[person_at(center_x)], WIDTH, &settings);
            assert_eq!(decision.command, expected, "center_x={}", center_x);
        }
    }

    #[test]
    fn sub_pixel_boxes_use_the_truncated_pixel_center() {
        let settings = PolicySettings::default();
        let at = |x1: f32, x2: f32| {
            let person = Detection::new("person", 0.8, BoundingBox::new(x1, 100.0, x2, 300.0));
            decide(&[person], WIDTH, &settings).command
        };
        // (199 + 200) / 2 = 199, left of the band.
        assert_eq!(at(199.3, 200.9), Command::Left);
        // (440 + 440) / 2 = 440, on the right edge.
        assert_eq!(at(440.2, 440.9), Command::Stop);
        // (200 + 201) / 2 = 200, on the left edge.
        assert_eq!(at(200.7, 201.2), Command::Stop);
        // (440 + 442) / 2 = 441.
        assert_eq!(at(440.9, 442.1), Command::Right);
    }

    #[test]
    fn odd_frame_width_uses_integer_midpoint() {
        assert_eq!(classify(200.0, 641, 120.0), Command::Stop);
        assert_eq!(classify(199.0, 641, 120.0), Command::Left);
        assert_eq!(classify(441.0, 641, 120.0), Command::Right);
    }

    #[test]
    fn last_detection_wins_by_default() {
        let dets = [person_at(100.0), person_at(600.0)];
        let decision = decide(&dets, WIDTH, &PolicySettings::default());
        assert_eq!(decision.command, Command::Right);
        assert_eq!(decision.target, Some(1));
        assert_eq!(decision.candidates, 2);
    }

    #[test]
    fn highest_confidence_selection() {
        let mut left = person_at(100.0);
        left.confidence = 0.95;
        let dets = [left, person_at(600.0)];
        let settings = PolicySettings {
            selection: SelectionPolicy::HighestConfidence,
            ..PolicySettings::default()
        };
        assert_eq!(decide(&dets, WIDTH, &settings).command, Command::Left);
    }

    #[test]
    fn largest_area_selection() {
        let big = Detection::new("person", 0.6, BoundingBox::new(0.0, 0.0, 150.0, 400.0));
        let dets = [big, person_at(320.0)];
        let settings = PolicySettings {
            selection: SelectionPolicy::LargestArea,
            ..PolicySettings::default()
        };
        let decision = decide(&dets, WIDTH, &settings);
        assert_eq!(decision.command, Command::Left);
        assert_eq!(decision.target, Some(0));
    }

    #[test]
    fn command_bytes() -> Result<()> {
        assert_eq!(Command::Left.as_byte(), b'L');
        assert_eq!(Command::Right.as_byte(), b'R');
        assert_eq!(Command::Stop.as_byte(), b'S');
        assert_eq!(Command::from_byte(b's')?, Command::Stop);
        assert!(Command::from_byte(b'X').is_err());
        Ok(())
    }

    #[test]
    fn selection_policy_parses_aliases() -> Result<()> {
        assert_eq!(SelectionPolicy::parse("last")?, SelectionPolicy::LastDetection);
        assert_eq!(
            SelectionPolicy::parse("Highest_Confidence")?,
            SelectionPolicy::HighestConfidence
        );
        assert!(SelectionPolicy::parse("random").is_err());
        Ok(())
    }
}
