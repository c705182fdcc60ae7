/// Axis-aligned box in source-frame pixel coordinates.
///
/// Coordinates are whatever the detection service reported for the frame it
/// was given. They are never rescaled to the currently displayed frame; if
/// the device resolution changed since the request was issued, the overlay
/// clips instead.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }
}

/// One detected object. Immutable once constructed.
#[derive(Clone, Debug, PartialEq)]
pub struct Detection {
    pub bounds: BoundingBox,
    /// Object label as reported by the service (e.g. "person").
    pub label: String,
    /// Confidence in 0..1.
    pub confidence: f32,
}

impl Detection {
    pub fn new(bounds: BoundingBox, label: impl Into<String>, confidence: f32) -> Self {
        Self {
            bounds,
            label: label.into(),
            confidence,
        }
    }

    /// Overlay tag text: label plus confidence percentage, one decimal.
    pub fn tag_text(&self) -> String {
        format!("{} ({:.1}%)", self.label, self.confidence * 100.0)
    }
}

/// The currently published detections plus the generation that produced
/// them.
///
/// The generation is assigned at request-issue time and is the tiebreaker
/// between out-of-order completions: the renderer only ever sees the set
/// with the highest generation among completed requests.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionResultSet {
    pub generation: u64,
    pub detections: Vec<Detection>,
}

impl DetectionResultSet {
    pub fn new(generation: u64, detections: Vec<Detection>) -> Self {
        Self {
            generation,
            detections,
        }
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_text_rounds_confidence_to_one_decimal() {
        let det = Detection::new(BoundingBox::new(0.0, 0.0, 10.0, 10.0), "person", 0.876);
        assert_eq!(det.tag_text(), "person (87.6%)");

        let det = Detection::new(BoundingBox::default(), "cat", 1.0);
        assert_eq!(det.tag_text(), "cat (100.0%)");
    }

    #[test]
    fn inverted_boxes_have_zero_extent() {
        let b = BoundingBox::new(50.0, 50.0, 10.0, 20.0);
        assert_eq!(b.width(), 0.0);
        assert_eq!(b.height(), 0.0);
    }

    #[test]
    fn default_result_set_is_generation_zero_and_empty() {
        let set = DetectionResultSet::default();
        assert_eq!(set.generation, 0);
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }
}
