//! YOLOv8 pre- and post-processing.
//!
//! These helpers are independent of the inference engine: they turn a frame into
//! the square CHW tensor the model expects and turn the raw prediction tensor back
//! into frame-space detections.

use anyhow::{anyhow, Result};

use crate::detect::nms::non_max_suppression;
use crate::detect::result::{BoundingBox, Detection, DetectionThresholds};
use crate::frame::{Frame, RGB_CHANNELS};

/// Padding value used by the letterbox, matching the model's training pipeline.
const LETTERBOX_FILL: f32 = 114.0 / 255.0;

/// Upper bound on boxes kept per frame after NMS.
pub const MAX_DETECTIONS: usize = 300;

/// COCO-80 class names in model output order.
pub const COCO_LABELS: [&str; 80] = [
    "person",
    "bicycle",
    "car",
    "motorcycle",
    "airplane",
    "bus",
    "train",
    "truck",
    "boat",
    "traffic light",
    "fire hydrant",
    "stop sign",
    "parking meter",
    "bench",
    "bird",
    "cat",
    "dog",
    "horse",
    "sheep",
    "cow",
    "elephant",
    "bear",
    "zebra",
    "giraffe",
    "backpack",
    "umbrella",
    "handbag",
    "tie",
    "suitcase",
    "frisbee",
    "skis",
    "snowboard",
    "sports ball",
    "kite",
    "baseball bat",
    "baseball glove",
    "skateboard",
    "surfboard",
    "tennis racket",
    "bottle",
    "wine glass",
    "cup",
    "fork",
    "knife",
    "spoon",
    "bowl",
    "banana",
    "apple",
    "sandwich",
    "orange",
    "broccoli",
    "carrot",
    "hot dog",
    "pizza",
    "donut",
    "cake",
    "chair",
    "couch",
    "potted plant",
    "bed",
    "dining table",
    "toilet",
    "tv",
    "laptop",
    "mouse",
    "remote",
    "keyboard",
    "cell phone",
    "microwave",
    "oven",
    "toaster",
    "sink",
    "refrigerator",
    "book",
    "clock",
    "vase",
    "scissors",
    "teddy bear",
    "hair drier",
    "toothbrush",
];

/// Geometry of an aspect-preserving resize into a square model input.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Letterbox {
    pub input_size: u32,
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub frame_width: u32,
    pub frame_height: u32,
}

impl Letterbox {
    pub fn new(frame_width: u32, frame_height: u32, input_size: u32) -> Result<Self> {
        if frame_width == 0 || frame_height == 0 || input_size == 0 {
            return Err(anyhow!(
                "letterbox needs non-zero sizes (frame {}x{}, input {})",
                frame_width,
                frame_height,
                input_size
            ));
        }
        let size = input_size as f32;
        let scale = (size / frame_width as f32).min(size / frame_height as f32);
        let scaled_w = (frame_width as f32 * scale).round();
        let scaled_h = (frame_height as f32 * scale).round();
        Ok(Self {
            input_size,
            scale,
            pad_x: ((size - scaled_w) / 2.0).floor(),
            pad_y: ((size - scaled_h) / 2.0).floor(),
            frame_width,
            frame_height,
        })
    }

    /// Map a box from model input space back to frame pixels, clamped to the frame.
    pub fn to_frame(&self, bbox: BoundingBox) -> BoundingBox {
        BoundingBox {
            x1: (bbox.x1 - self.pad_x) / self.scale,
            y1: (bbox.y1 - self.pad_y) / self.scale,
            x2: (bbox.x2 - self.pad_x) / self.scale,
            y2: (bbox.y2 - self.pad_y) / self.scale,
        }
        .clamp_to(self.frame_width, self.frame_height)
    }
}

/// Letterbox a frame into a `[3, size, size]` tensor (channel-major, values in `0..=1`).
///
/// Sampling is nearest-neighbour; the padding is filled with gray.
pub fn letterbox_chw(frame: &Frame, letterbox: &Letterbox) -> Vec<f32> {
    let size = letterbox.input_size as usize;
    let plane = size * size;
    let mut out = vec![LETTERBOX_FILL; plane * RGB_CHANNELS];

    let pixels = frame.pixels();
    let fw = frame.width as usize;
    let fh = frame.height as usize;
    let scaled_w = (frame.width as f32 * letterbox.scale).round() as usize;
    let scaled_h = (frame.height as f32 * letterbox.scale).round() as usize;
    let pad_x = letterbox.pad_x as usize;
    let pad_y = letterbox.pad_y as usize;

    for y in 0..scaled_h.min(size.saturating_sub(pad_y)) {
        let src_y = ((y as f32 / letterbox.scale) as usize).min(fh - 1);
        for x in 0..scaled_w.min(size.saturating_sub(pad_x)) {
            let src_x = ((x as f32 / letterbox.scale) as usize).min(fw - 1);
            let src = (src_y * fw + src_x) * RGB_CHANNELS;
            let dst = (y + pad_y) * size + (x + pad_x);
            for channel in 0..RGB_CHANNELS {
                out[channel * plane + dst] = pixels[src + channel] as f32 / 255.0;
            }
        }
    }

    out
}

/// Decode a YOLOv8 prediction tensor into frame-space detections.
///
/// Accepts `[1, 4 + classes, anchors]` (the exported layout) and the transposed
/// `[1, anchors, 4 + classes]`. Rows are `cx, cy, w, h` in input pixels followed
/// by one score per class.
pub fn decode_predictions(
    data: &[f32],
    shape: &[usize],
    letterbox: &Letterbox,
    labels: &[&str],
    thresholds: &DetectionThresholds,
) -> Result<Vec<Detection>> {
    let (channels, anchors, channels_first) = match shape {
        [1, a, b] if *a == labels.len() + 4 => (*a, *b, true),
        [1, a, b] if *b == labels.len() + 4 => (*b, *a, false),
        [1, a, b] if a <= b && *a > 4 => (*a, *b, true),
        [1, a, b] if *b > 4 => (*b, *a, false),
        _ => {
            return Err(anyhow!(
                "unexpected prediction shape {:?} for {} labels",
                shape,
                labels.len()
            ))
        }
    };
    if data.len() != channels * anchors {
        return Err(anyhow!(
            "prediction tensor has {} values, shape {:?} needs {}",
            data.len(),
            shape,
            channels * anchors
        ));
    }

    let at = |channel: usize, anchor: usize| -> f32 {
        if channels_first {
            data[channel * anchors + anchor]
        } else {
            data[anchor * channels + channel]
        }
    };

    let mut candidates = Vec::new();
    for anchor in 0..anchors {
        let mut best_class = 0usize;
        let mut best_score = f32::NEG_INFINITY;
        for class in 0..channels - 4 {
            let score = at(class + 4, anchor);
            if score > best_score {
                best_score = score;
                best_class = class;
            }
        }
        if best_score <= thresholds.confidence {
            continue;
        }

        let input_box = BoundingBox::from_center(
            at(0, anchor),
            at(1, anchor),
            at(2, anchor),
            at(3, anchor),
        );
        let label = labels
            .get(best_class)
            .map(|label| label.to_string())
            .unwrap_or_else(|| format!("class{}", best_class));
        candidates.push(Detection::new(
            label,
            best_score,
            letterbox.to_frame(input_box),
        ));
    }

    let mut kept = non_max_suppression(candidates, thresholds.iou);
    kept.truncate(MAX_DETECTIONS);
    Ok(kept)
}
