use crate::mot::TrackerError;

/// Axis-aligned bounding box: top-left corner plus size.
/// Width and height are expected to be non-negative.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    pub fn new(_x: f32, _y: f32, _width: f32, _height: f32) -> Self {
        Rect {
            x: _x,
            y: _y,
            width: _width,
            height: _height,
        }
    }
    /// Parses a 4-number box encoding in the given coordinate format.
    ///
    /// Basic usage:
    ///
    /// ```
    /// use sort_rs::utils::{BBoxFormat, Rect};
    /// let rect = Rect::from_coords([5.0, 5.0, 10.0, 10.0], BBoxFormat::CenterWh);
    /// assert_eq!(rect, Rect::new(0.0, 0.0, 10.0, 10.0));
    /// ```
    pub fn from_coords(coords: [f32; 4], format: BBoxFormat) -> Self {
        match format {
            BBoxFormat::TopLeftWh => Rect::new(coords[0], coords[1], coords[2], coords[3]),
            BBoxFormat::CenterWh => Rect::new(
                coords[0] - coords[2] / 2.0,
                coords[1] - coords[3] / 2.0,
                coords[2],
                coords[3],
            ),
            BBoxFormat::Corners => Rect::new(
                coords[0],
                coords[1],
                coords[2] - coords[0],
                coords[3] - coords[1],
            ),
        }
    }
    /// Renders the box as a 4-number encoding in the given coordinate format.
    pub fn to_coords(&self, format: BBoxFormat) -> [f32; 4] {
        match format {
            BBoxFormat::TopLeftWh => [self.x, self.y, self.width, self.height],
            BBoxFormat::CenterWh => [
                self.x + self.width / 2.0,
                self.y + self.height / 2.0,
                self.width,
                self.height,
            ],
            BBoxFormat::Corners => [
                self.x,
                self.y,
                self.x + self.width,
                self.y + self.height,
            ],
        }
    }
}

/// Coordinate layout of a 4-number box encoding.
/// Shared between detection parsing and track output rendering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BBoxFormat {
    /// \[xmin, ymin, width, height\]
    TopLeftWh,
    /// \[xcenter, ycenter, width, height\]
    CenterWh,
    /// \[xmin, ymin, xmax, ymax\]
    Corners,
}

impl TryFrom<i64> for BBoxFormat {
    type Error = TrackerError;
    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(BBoxFormat::TopLeftWh),
            1 => Ok(BBoxFormat::CenterWh),
            2 => Ok(BBoxFormat::Corners),
            other => Err(TrackerError::InvalidInput(format!(
                "Box format must be 0, 1 or 2, got {}",
                other
            ))),
        }
    }
}

/// Intersection over union of two rectangles. Returns a value in \[0, 1\]:
/// 0.0 for disjoint boxes, 1.0 for identical ones.
pub fn iou(a: &Rect, b: &Rect) -> f32 {
    let x_left = f32::max(a.x, b.x);
    let y_top = f32::max(a.y, b.y);
    let x_right = f32::min(a.x + a.width, b.x + b.width);
    let y_bottom = f32::min(a.y + a.height, b.y + b.height);
    if x_right <= x_left || y_bottom <= y_top {
        return 0.0;
    }
    let intersection = (x_right - x_left) * (y_bottom - y_top);
    let union = a.width * a.height + b.width * b.height - intersection;
    if union <= 0.0 {
        return 0.0;
    }
    intersection / union
}

/// Converts a rectangle into the Kalman observation vector
/// \[center_x, center_y, scale (area), aspect ratio\].
pub fn rect_to_observation(rect: &Rect) -> [f32; 4] {
    let cx = rect.x + rect.width / 2.0;
    let cy = rect.y + rect.height / 2.0;
    let s = rect.width * rect.height;
    // Zero-area boxes have no aspect ratio; the slot carries the signed
    // extent (+width or -height) instead so the conversion stays lossless
    let r = if s > 0.0 {
        rect.width / rect.height
    } else if rect.width > 0.0 {
        rect.width
    } else {
        -rect.height
    };
    [cx, cy, s, r]
}

/// Converts the \[center_x, center_y, scale, aspect ratio\] observation vector
/// back into a rectangle. Inverse of [rect_to_observation].
pub fn observation_to_rect(z: &[f32; 4]) -> Rect {
    let (width, height) = if z[2] > 0.0 {
        let width = f32::sqrt(f32::max(z[2] * z[3], 0.0));
        let height = if width > 0.0 { z[2] / width } else { 0.0 };
        (width, height)
    } else if z[2] == 0.0 {
        // Signed-extent encoding of a zero-area box, see rect_to_observation
        if z[3] >= 0.0 {
            (z[3], 0.0)
        } else {
            (0.0, -z[3])
        }
    } else {
        // Negative scale only arises from degenerate filter states
        (0.0, 0.0)
    };
    Rect::new(z[0] - width / 2.0, z[1] - height / 2.0, width, height)
}
