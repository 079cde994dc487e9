//! Fundamental types used across the entire workspace.

use nalgebra::Vector2;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Scalar types: pixel geometry is integral, motion estimates are f64.
// ---------------------------------------------------------------------------

/// 2D vector in pixel space: velocity (px/s) or a predicted position (px).
pub type Vec2 = Vector2<f64>;

// ---------------------------------------------------------------------------
// Identifier types
// ---------------------------------------------------------------------------

#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct TrackId(pub u64);

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "T{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Roles
// ---------------------------------------------------------------------------

/// Rank of a tracked target. A role is a slot, not an identity: tracks move
/// between roles through promotion, reordering and arbitration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// The primary target, the one the aiming loop follows
    Head,
    /// Nearest remaining target to the head
    Primary,
    /// Third-ranked target
    Secondary,
}

impl Role {
    /// All roles in priority order.
    pub const ALL: [Role; 3] = [Role::Head, Role::Primary, Role::Secondary];

    /// Slot index of this role (0 = head).
    pub fn index(self) -> usize {
        match self {
            Role::Head => 0,
            Role::Primary => 1,
            Role::Secondary => 2,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Role::Head => "HEAD",
            Role::Primary => "PRIMARY",
            Role::Secondary => "SECONDARY",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Geometry
// ---------------------------------------------------------------------------

/// Integer pixel position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in pixels.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = f64::from(self.x) - f64::from(other.x);
        let dy = f64::from(self.y) - f64::from(other.y);
        dx.hypot(dy)
    }

    pub fn to_vec2(self) -> Vec2 {
        Vec2::new(f64::from(self.x), f64::from(self.y))
    }
}

/// Axis-aligned bounding box in pixel coordinates, `x1 < x2`, `y1 < y2` for
/// well-formed boxes. Inverted or zero-area boxes are tolerated: they have
/// zero area and never overlap anything.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BBox {
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// Box of the given size centred on `(cx, cy)`.
    pub fn from_center(cx: f64, cy: f64, w: f64, h: f64) -> Self {
        Self {
            x1: (cx - w / 2.0) as i32,
            y1: (cy - h / 2.0) as i32,
            x2: (cx + w / 2.0) as i32,
            y2: (cy + h / 2.0) as i32,
        }
    }

    /// Integer midpoint (floor division, also for negative coordinates).
    pub fn center(&self) -> Point {
        Point::new(
            (self.x1 + self.x2).div_euclid(2),
            (self.y1 + self.y2).div_euclid(2),
        )
    }

    pub fn width(&self) -> i32 {
        (self.x2 - self.x1).max(0)
    }

    pub fn height(&self) -> i32 {
        (self.y2 - self.y1).max(0)
    }

    pub fn area(&self) -> i64 {
        i64::from(self.width()) * i64::from(self.height())
    }
}

// ---------------------------------------------------------------------------
// Detections
// ---------------------------------------------------------------------------

/// One box reported by the object detector for one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    pub bbox: BBox,
    /// Detector confidence in [0, 1]
    pub confidence: f64,
    /// Detector class id (carried through, not used for association)
    pub class_id: u32,
}

impl Detection {
    pub fn new(bbox: BBox, confidence: f64, class_id: u32) -> Self {
        Self {
            bbox,
            confidence,
            class_id,
        }
    }

    /// Build from raw detector output. Float corners are truncated toward zero.
    pub fn from_corners(x1: f64, y1: f64, x2: f64, y2: f64, confidence: f64, class_id: u32) -> Self {
        Self::new(
            BBox::new(x1 as i32, y1 as i32, x2 as i32, y2 as i32),
            confidence,
            class_id,
        )
    }

    /// Confidence on the tracker's 0–100 scale.
    pub fn confidence_pct(&self) -> f64 {
        self.confidence * 100.0
    }
}

/// All detections for one frame, stamped with the frame's capture time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct FrameDetections {
    pub frame_index: u64,
    /// Capture time in seconds (monotonic)
    pub timestamp: f64,
    pub detections: Vec<Detection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_uses_floor_division() {
        assert_eq!(BBox::new(100, 100, 140, 140).center(), Point::new(120, 120));
        assert_eq!(BBox::new(0, 0, 5, 5).center(), Point::new(2, 2));
        assert_eq!(BBox::new(-5, -5, 0, 0).center(), Point::new(-3, -3));
    }

    #[test]
    fn inverted_box_has_zero_area() {
        let b = BBox::new(10, 10, 5, 20);
        assert_eq!(b.width(), 0);
        assert_eq!(b.area(), 0);
    }

    #[test]
    fn from_corners_truncates() {
        let d = Detection::from_corners(10.9, 20.2, 50.7, 60.999, 0.5, 0);
        assert_eq!(d.bbox, BBox::new(10, 20, 50, 60));
    }

    #[test]
    fn role_order_and_labels() {
        assert_eq!(Role::ALL.map(Role::index), [0, 1, 2]);
        assert_eq!(Role::Secondary.to_string(), "SECONDARY");
        assert_eq!(TrackId(7).to_string(), "T7");
    }
}
