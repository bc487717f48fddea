//! Frame annotation: detection boxes, confidence labels and the center band.

use font8x8::{UnicodeFonts, BASIC_FONTS};

use crate::detect::{BoundingBox, Detection};
use crate::frame::Frame;

pub const BOX_COLOR: [u8; 3] = [255, 255, 0];
pub const GUIDE_COLOR: [u8; 3] = [90, 90, 90];
pub const BOX_THICKNESS: i64 = 2;

/// Gap between the label baseline and the top edge of the box.
pub const LABEL_OFFSET_PX: i64 = 10;

const GLYPH_SIZE: i64 = 8;

/// Draw every `target_label` detection and the center band guides.
pub fn annotate(frame: &mut Frame, detections: &[Detection], target_label: &str, band: f32) {
    draw_center_band(frame, band, GUIDE_COLOR);
    for detection in detections.iter().filter(|d| d.label == target_label) {
        draw_rect(frame, &detection.bbox, BOX_COLOR, BOX_THICKNESS);
        let x = detection.bbox.x1.round() as i64;
        let y = detection.bbox.y1.round() as i64 - LABEL_OFFSET_PX;
        draw_text(frame, x, y, &label_text(detection), BOX_COLOR);
    }
}

/// `person` at 0.871 becomes `Person 0.87`.
pub fn label_text(detection: &Detection) -> String {
    let mut chars = detection.label.chars();
    let name = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => String::new(),
    };
    format!("{} {:.2}", name, detection.confidence)
}

/// Rectangle outline growing inward from the box edges.
pub fn draw_rect(frame: &mut Frame, bbox: &BoundingBox, color: [u8; 3], thickness: i64) {
    let x1 = bbox.x1.round() as i64;
    let y1 = bbox.y1.round() as i64;
    let x2 = bbox.x2.round() as i64;
    let y2 = bbox.y2.round() as i64;
    for t in 0..thickness.max(1) {
        draw_hline(frame, x1, x2, y1 + t, color);
        draw_hline(frame, x1, x2, y2 - t, color);
        draw_vline(frame, x1 + t, y1, y2, color);
        draw_vline(frame, x2 - t, y1, y2, color);
    }
}

/// Vertical guides at `width / 2 ± band`.
pub fn draw_center_band(frame: &mut Frame, band: f32, color: [u8; 3]) {
    let center = frame.center_x();
    let bottom = frame.height as i64 - 1;
    for x in [center - band, center + band] {
        draw_vline(frame, x.round() as i64, 0, bottom, color);
    }
}

/// Render ASCII text with `(x, baseline)` as the bottom-left corner.
///
/// Characters without a glyph are skipped but still advance the cursor.
pub fn draw_text(frame: &mut Frame, x: i64, baseline: i64, text: &str, color: [u8; 3]) {
    let top = baseline - GLYPH_SIZE;
    for (i, ch) in text.chars().enumerate() {
        let Some(glyph) = BASIC_FONTS.get(ch) else {
            continue;
        };
        let left = x + i as i64 * GLYPH_SIZE;
        for (row, bits) in glyph.iter().enumerate() {
            for col in 0..GLYPH_SIZE {
                if bits & (1 << col) != 0 {
                    frame.put_pixel(left + col, top + row as i64, color);
                }
            }
        }
    }
}

fn draw_hline(frame: &mut Frame, x1: i64, x2: i64, y: i64, color: [u8; 3]) {
    for x in x1.min(x2)..=x1.max(x2) {
        frame.put_pixel(x, y, color);
    }
}

fn draw_vline(frame: &mut Frame, x: i64, y1: i64, y2: i64, color: [u8; 3]) {
    for y in y1.min(y2)..=y1.max(y2) {
        frame.put_pixel(x, y, color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;

    const BLACK: [u8; 3] = [0, 0, 0];

    fn person(x1: f32, y1: f32, x2: f32, y2: f32) -> Detection {
        Detection::new("person", 0.871, BoundingBox::new(x1, y1, x2, y2))
    }

    #[test]
    fn label_is_capitalized_with_two_decimals() {
        assert_eq!(label_text(&person(0.0, 0.0, 1.0, 1.0)), "Person 0.87");
    }

    #[test]
    fn rect_is_two_pixels_thick() -> Result<()> {
        let mut frame = Frame::filled(64, 64, BLACK, 0)?;
        draw_rect(&mut frame, &BoundingBox::new(10.0, 10.0, 40.0, 50.0), BOX_COLOR, 2);

        assert_eq!(frame.get_pixel(20, 10), Some(BOX_COLOR));
        assert_eq!(frame.get_pixel(20, 11), Some(BOX_COLOR));
        assert_eq!(frame.get_pixel(20, 12), Some(BLACK));
        assert_eq!(frame.get_pixel(40, 30), Some(BOX_COLOR));
        assert_eq!(frame.get_pixel(39, 30), Some(BOX_COLOR));
        assert_eq!(frame.get_pixel(38, 30), Some(BLACK));
        assert_eq!(frame.get_pixel(25, 30), Some(BLACK));
        Ok(())
    }

    #[test]
    fn drawing_past_the_edges_is_clipped() -> Result<()> {
        let mut frame = Frame::filled(16, 16, BLACK, 0)?;
        draw_rect(&mut frame, &BoundingBox::new(-5.0, -5.0, 30.0, 30.0), BOX_COLOR, 2);
        draw_text(&mut frame, -4, 2, "Person 0.99", BOX_COLOR);
        assert_eq!(frame.get_pixel(8, 8), Some(BLACK));
        Ok(())
    }

    #[test]
    fn text_sits_above_the_baseline() -> Result<()> {
        let mut frame = Frame::filled(32, 32, BLACK, 0)?;
        draw_text(&mut frame, 0, 20, "#", BOX_COLOR);

        let lit_rows: Vec<u32> = (0..32)
            .filter(|&y| (0..8).any(|x| frame.get_pixel(x, y) == Some(BOX_COLOR)))
            .collect();
        assert!(!lit_rows.is_empty());
        assert!(lit_rows.iter().all(|&y| (12..20).contains(&y)));
        Ok(())
    }

    #[test]
    fn annotate_skips_other_labels_and_draws_band() -> Result<()> {
        let mut frame = Frame::filled(640, 480, BLACK, 0)?;
        let detections = vec![
            Detection::new("dog", 0.9, BoundingBox::new(400.0, 100.0, 500.0, 200.0)),
            person(100.0, 100.0, 200.0, 300.0),
        ];
        annotate(&mut frame, &detections, "person", 120.0);

        assert_eq!(frame.get_pixel(150, 100), Some(BOX_COLOR));
        assert_eq!(frame.get_pixel(450, 100), Some(BLACK));
        assert_eq!(frame.get_pixel(200, 400), Some(GUIDE_COLOR));
        assert_eq!(frame.get_pixel(440, 400), Some(GUIDE_COLOR));
        Ok(())
    }
}
