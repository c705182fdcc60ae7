//! Overlay composition: paints detection boxes and label tags onto a frame.
//!
//! The renderer is a pure function of (frame, result set). It never mutates
//! the input frame and never rescales coordinates; stale boxes from an older
//! frame size are drawn where they land and clipped at the canvas edge.

pub mod font;

use image::{Rgb, RgbImage};

use crate::detect::{Detection, DetectionResultSet};
use crate::frame::VideoFrame;

/// Colors and sizing for painted overlays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OverlayStyle {
    pub box_color: Rgb<u8>,
    pub box_thickness: u32,
    pub tag_fill: Rgb<u8>,
    pub tag_text: Rgb<u8>,
    pub text_scale: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            box_color: Rgb([0, 255, 0]),
            box_thickness: 2,
            tag_fill: Rgb([0, 255, 0]),
            tag_text: Rgb([0, 0, 0]),
            text_scale: 2,
        }
    }
}

// Label tag placement relative to the box top-left corner, inward so the
// tag stays readable for boxes touching the frame edge.
const TAG_OFFSET_X: i64 = 5;
const TAG_OFFSET_Y: i64 = 6;
const TAG_PAD: i64 = 2;

/// Paints detection overlays onto frame copies.
pub struct OverlayRenderer {
    style: OverlayStyle,
}

impl OverlayRenderer {
    pub fn new(style: OverlayStyle) -> Self {
        Self { style }
    }

    pub fn style(&self) -> &OverlayStyle {
        &self.style
    }

    /// Compose the frame with the given result set into a fresh canvas.
    ///
    /// An empty result set yields a pixel-exact copy of the frame. The same
    /// inputs always produce the same canvas.
    pub fn paint(&self, frame: &VideoFrame, results: &DetectionResultSet) -> RgbImage {
        let mut canvas = frame.image.clone();
        for detection in &results.detections {
            self.draw_box(&mut canvas, detection);
            self.draw_tag(&mut canvas, detection);
        }
        canvas
    }

    fn draw_box(&self, canvas: &mut RgbImage, detection: &Detection) {
        let x0 = detection.bounds.x1.round() as i64;
        let y0 = detection.bounds.y1.round() as i64;
        let x1 = detection.bounds.x2.round() as i64;
        let y1 = detection.bounds.y2.round() as i64;
        // One inset ring per pixel of thickness.
        for t in 0..self.style.box_thickness as i64 {
            let (rx0, ry0, rx1, ry1) = (x0 + t, y0 + t, x1 - t, y1 - t);
            if rx0 > rx1 || ry0 > ry1 {
                break;
            }
            fill_rect(canvas, rx0, ry0, rx1, ry0, self.style.box_color);
            fill_rect(canvas, rx0, ry1, rx1, ry1, self.style.box_color);
            fill_rect(canvas, rx0, ry0, rx0, ry1, self.style.box_color);
            fill_rect(canvas, rx1, ry0, rx1, ry1, self.style.box_color);
        }
    }

    fn draw_tag(&self, canvas: &mut RgbImage, detection: &Detection) {
        let text = detection.tag_text();
        let scale = self.style.text_scale;
        let text_x = detection.bounds.x1.round() as i64 + TAG_OFFSET_X;
        let text_y = detection.bounds.y1.round() as i64 + TAG_OFFSET_Y;
        let text_w = font::text_width(&text, scale) as i64;
        let text_h = font::text_height(scale) as i64;
        fill_rect(
            canvas,
            text_x - TAG_PAD,
            text_y - TAG_PAD,
            text_x + text_w + TAG_PAD - 1,
            text_y + text_h + TAG_PAD - 1,
            self.style.tag_fill,
        );
        font::draw_text(canvas, text_x, text_y, &text, self.style.tag_text, scale);
    }
}

impl Default for OverlayRenderer {
    fn default() -> Self {
        Self::new(OverlayStyle::default())
    }
}

/// Fill the inclusive rectangle [x0, x1] x [y0, y1], clipped to the canvas.
fn fill_rect(canvas: &mut RgbImage, x0: i64, y0: i64, x1: i64, y1: i64, color: Rgb<u8>) {
    let x_lo = x0.max(0);
    let y_lo = y0.max(0);
    let x_hi = x1.min(canvas.width() as i64 - 1);
    let y_hi = y1.min(canvas.height() as i64 - 1);
    for y in y_lo..=y_hi {
        for x in x_lo..=x_hi {
            canvas.put_pixel(x as u32, y as u32, color);
        }
    }
}
