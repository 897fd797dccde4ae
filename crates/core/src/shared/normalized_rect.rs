use serde::{Deserialize, Serialize};

/// Axis-aligned rectangle in `[0, 1]` image-relative coordinates.
///
/// The origin is the bottom-left corner of the image, so `y` grows upward.
/// This is the convention of the model interface; conversion to top-left
/// pixel space happens only in the overlay transform.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NormalizedRect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl NormalizedRect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Builds a rect from pixel corners `(x1, y1, x2, y2)` measured from the
    /// top-left of an image of `image_w` x `image_h`, clamping to the image.
    pub fn from_top_left_corners(
        corners: (f64, f64, f64, f64),
        image_w: f64,
        image_h: f64,
    ) -> Self {
        let (x1, y1, x2, y2) = corners;
        let left = (x1 / image_w).clamp(0.0, 1.0);
        let right = (x2 / image_w).clamp(0.0, 1.0);
        let top = (y1 / image_h).clamp(0.0, 1.0);
        let bottom = (y2 / image_h).clamp(0.0, 1.0);
        Self {
            x: left,
            y: 1.0 - bottom,
            width: (right - left).max(0.0),
            height: (bottom - top).max(0.0),
        }
    }

    pub fn max_x(&self) -> f64 {
        self.x + self.width
    }

    pub fn max_y(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width * self.height
    }

    pub fn iou(&self, other: &NormalizedRect) -> f64 {
        let ix = (self.max_x().min(other.max_x()) - self.x.max(other.x)).max(0.0);
        let iy = (self.max_y().min(other.max_y()) - self.y.max(other.y)).max(0.0);
        let inter = ix * iy;
        if inter == 0.0 {
            return 0.0;
        }
        inter / (self.area() + other.area() - inter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rstest::rstest;

    #[test]
    fn test_from_top_left_corners_flips_vertical_axis() {
        // Box occupying the top quarter-strip of a 100x200 image.
        let r = NormalizedRect::from_top_left_corners((10.0, 0.0, 60.0, 50.0), 100.0, 200.0);
        assert_relative_eq!(r.x, 0.1);
        assert_relative_eq!(r.width, 0.5);
        assert_relative_eq!(r.height, 0.25);
        // Bottom edge sits at 50px from the top, i.e. 0.75 from the bottom.
        assert_relative_eq!(r.y, 0.75);
        assert_relative_eq!(r.max_y(), 1.0);
    }

    #[test]
    fn test_from_top_left_corners_clamps_to_image() {
        let r = NormalizedRect::from_top_left_corners((-20.0, -10.0, 120.0, 250.0), 100.0, 200.0);
        assert_relative_eq!(r.x, 0.0);
        assert_relative_eq!(r.y, 0.0);
        assert_relative_eq!(r.width, 1.0);
        assert_relative_eq!(r.height, 1.0);
    }

    #[test]
    fn test_iou_identical() {
        let r = NormalizedRect::new(0.1, 0.1, 0.2, 0.2);
        assert_relative_eq!(r.iou(&r), 1.0);
    }

    #[rstest]
    #[case::disjoint(NormalizedRect::new(0.0, 0.0, 0.1, 0.1), NormalizedRect::new(0.5, 0.5, 0.1, 0.1), 0.0)]
    #[case::touching(NormalizedRect::new(0.0, 0.0, 0.5, 0.5), NormalizedRect::new(0.5, 0.0, 0.5, 0.5), 0.0)]
    #[case::half_shift(NormalizedRect::new(0.0, 0.0, 0.4, 0.4), NormalizedRect::new(0.2, 0.0, 0.4, 0.4), 0.08 / 0.24)]
    #[case::zero_width(NormalizedRect::new(0.0, 0.0, 0.0, 0.4), NormalizedRect::new(0.0, 0.0, 0.4, 0.4), 0.0)]
    fn test_iou_cases(#[case] a: NormalizedRect, #[case] b: NormalizedRect, #[case] expected: f64) {
        assert_relative_eq!(a.iou(&b), expected, epsilon = 1e-12);
    }
}
