//! Target trajectory models and state propagation in image space.
//!
//! Each target is a fixed-size box whose center moves in pixel coordinates
//! according to a `MotionSpec`. The camera steps every target once per frame.

use serde::{Deserialize, Serialize};
use tracker_core::{BBox, Point};

/// Describes how a target moves.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum MotionSpec {
    /// Constant velocity, no bounds.
    ConstantVelocity,
    /// Constant velocity, reflected off the borders of a `width` × `height` image
    /// so the box stays inside it.
    Bounce { width: f64, height: f64 },
    /// Velocity switches at given sim times.
    /// `segments` is sorted by time ascending: [(t_start, [vx, vy]), ...].
    /// The active velocity is the last one whose t_start <= current_t.
    Segmented { segments: Vec<(f64, [f64; 2])> },
}

/// A simulated target with ground-truth state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Target {
    /// Target ID (used for metrics); a target hidden and shown again keeps its ID
    pub id: u64,
    /// True box center (px)
    pub center: [f64; 2],
    /// Velocity (px/s)
    pub velocity: [f64; 2],
    /// Box width and height (px)
    pub size: [f64; 2],
    /// Motion model for this target
    pub motion: MotionSpec,
    /// Optional: target appears after this time (no detections before)
    pub appear_at: Option<f64>,
    /// Optional: target disappears after this time
    pub disappear_at: Option<f64>,
}

impl Target {
    pub fn new(
        id: u64,
        center: [f64; 2],
        velocity: [f64; 2],
        size: [f64; 2],
        motion: MotionSpec,
    ) -> Self {
        Self {
            id,
            center,
            velocity,
            size,
            motion,
            appear_at: None,
            disappear_at: None,
        }
    }

    /// Visible only within `[appear_at, disappear_at)`.
    pub fn visible_between(mut self, appear_at: Option<f64>, disappear_at: Option<f64>) -> Self {
        self.appear_at = appear_at;
        self.disappear_at = disappear_at;
        self
    }

    /// Propagate the true state by `dt` seconds starting at time `t`.
    pub fn step(&mut self, t: f64, dt: f64) {
        if let MotionSpec::Segmented { segments } = &self.motion {
            if let Some((_, v)) = segments.iter().filter(|(t_start, _)| *t_start <= t).last() {
                self.velocity = *v;
            }
        }

        self.center[0] += self.velocity[0] * dt;
        self.center[1] += self.velocity[1] * dt;

        if let MotionSpec::Bounce { width, height } = self.motion {
            let bounds = [width, height];
            for axis in 0..2 {
                let half = self.size[axis] / 2.0;
                let (lo, hi) = (half, bounds[axis] - half);
                if self.center[axis] < lo {
                    self.center[axis] = 2.0 * lo - self.center[axis];
                    self.velocity[axis] = self.velocity[axis].abs();
                } else if self.center[axis] > hi {
                    self.center[axis] = 2.0 * hi - self.center[axis];
                    self.velocity[axis] = -self.velocity[axis].abs();
                }
            }
        }
    }

    /// True if target is visible at time `t`.
    pub fn is_active(&self, t: f64) -> bool {
        if let Some(appear) = self.appear_at {
            if t < appear {
                return false;
            }
        }
        if let Some(disappear) = self.disappear_at {
            if t >= disappear {
                return false;
            }
        }
        true
    }

    /// Current true box.
    pub fn bbox(&self) -> BBox {
        BBox::from_center(self.center[0], self.center[1], self.size[0], self.size[1])
    }

    /// Center rounded to the pixel grid
    pub fn center_point(&self) -> Point {
        Point::new(self.center[0].round() as i32, self.center[1].round() as i32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn still(center: [f64; 2], size: [f64; 2]) -> Target {
        Target::new(0, center, [0.0, 0.0], size, MotionSpec::ConstantVelocity)
    }

    #[test]
    fn constant_velocity_moves_linearly() {
        let mut t = still([100.0, 100.0], [40.0, 40.0]);
        t.velocity = [30.0, -10.0];
        for i in 0..10 {
            t.step(f64::from(i) * 0.1, 0.1);
        }
        assert_abs_diff_eq!(t.center[0], 130.0, epsilon = 1e-9);
        assert_abs_diff_eq!(t.center[1], 90.0, epsilon = 1e-9);
    }

    #[test]
    fn bbox_is_centered() {
        let t = still([130.0, 90.0], [40.0, 60.0]);
        assert_eq!(t.bbox(), BBox::new(110, 60, 150, 120));
        assert_eq!(t.center_point(), Point::new(130, 90));
    }

    #[test]
    fn bounce_reflects_at_border() {
        let motion = MotionSpec::Bounce {
            width: 200.0,
            height: 200.0,
        };
        let mut t = Target::new(0, [170.0, 100.0], [100.0, 0.0], [20.0, 20.0], motion);
        t.step(0.0, 0.2);
        // Box edge lands exactly on the border
        assert_abs_diff_eq!(t.center[0], 190.0, epsilon = 1e-9);
        t.step(0.2, 0.1);
        assert_abs_diff_eq!(t.center[0], 180.0, epsilon = 1e-9);
        assert!(t.velocity[0] < 0.0);
    }

    #[test]
    fn segmented_switches_velocity() {
        let motion = MotionSpec::Segmented {
            segments: vec![(0.0, [10.0, 0.0]), (1.0, [0.0, 20.0])],
        };
        let mut t = Target::new(0, [0.0, 0.0], [0.0, 0.0], [10.0, 10.0], motion);
        t.step(0.5, 0.5);
        assert_abs_diff_eq!(t.center[0], 5.0, epsilon = 1e-9);
        t.step(1.0, 0.5);
        assert_abs_diff_eq!(t.center[0], 5.0, epsilon = 1e-9);
        assert_abs_diff_eq!(t.center[1], 10.0, epsilon = 1e-9);
    }

    #[test]
    fn visibility_window() {
        let t = still([0.0, 0.0], [10.0, 10.0]).visible_between(Some(1.0), Some(2.0));
        assert!(!t.is_active(0.5));
        assert!(t.is_active(1.0));
        assert!(!t.is_active(2.0));
    }
}
