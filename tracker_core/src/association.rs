//! Data association: box overlap (IoU), composite match score between a track
//! and a candidate detection, and best-role selection.
//!
//! # Match score
//! For a detection whose center lies within `distance_threshold` of a track:
//!
//! ```text
//! score = w_d·(1 − d/R) + w_o·IoU + (lock_bonus if locked) + w_p·(1 − d_pred/R)
//! ```
//!
//! where the prediction term only applies when the track has a lead prediction
//! that is itself within `R` of the detection. The score is not clamped.

use crate::{
    track::Track,
    types::{BBox, Point, Role},
};
use serde::{Deserialize, Serialize};

/// Association tuning.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AssociationConfig {
    /// Search radius around a track center (px)
    pub distance_threshold: f64,
    /// Weight of the normalised center distance term
    pub distance_weight: f64,
    /// Weight of the IoU term
    pub overlap_weight: f64,
    /// Flat bonus for locked tracks
    pub lock_bonus: f64,
    /// Weight of the normalised prediction distance term
    pub prediction_weight: f64,
    /// Minimum score to commit an update
    pub match_accept_score: f64,
    /// Minimum score for a role to count as the best match at all
    pub best_role_accept_score: f64,
}

impl Default for AssociationConfig {
    fn default() -> Self {
        Self {
            distance_threshold: 150.0,
            distance_weight: 0.3,
            overlap_weight: 0.4,
            lock_bonus: 0.5,
            prediction_weight: 0.6,
            match_accept_score: 0.3,
            best_role_accept_score: 0.2,
        }
    }
}

/// Intersection over union of two boxes. Zero for disjoint or degenerate boxes.
pub fn overlap(a: &BBox, b: &BBox) -> f64 {
    if a.x2 <= b.x1 || b.x2 <= a.x1 || a.y2 <= b.y1 || b.y2 <= a.y1 {
        return 0.0;
    }

    let iw = i64::from(a.x2.min(b.x2) - a.x1.max(b.x1));
    let ih = i64::from(a.y2.min(b.y2) - a.y1.max(b.y1));
    if iw <= 0 || ih <= 0 {
        return 0.0;
    }

    let intersection = iw * ih;
    let union = a.area() + b.area() - intersection;
    if union <= 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// Composite similarity between `track` and a detection. `None` when the
/// detection center lies outside the search radius.
pub fn match_score(
    track: &Track,
    detection_box: &BBox,
    detection_center: &Point,
    now: f64,
    config: &AssociationConfig,
) -> Option<f64> {
    let radius = config.distance_threshold;
    let distance = track.distance_to_point(detection_center);
    if distance >= radius {
        return None;
    }

    let distance_term = config.distance_weight * (1.0 - distance / radius);
    let overlap_term = config.overlap_weight * overlap(&track.bbox, detection_box);
    let lock_term = if track.is_locked(now) {
        config.lock_bonus
    } else {
        0.0
    };
    let prediction_term = track
        .predicted
        .map(|p| (p - detection_center.to_vec2()).norm())
        .filter(|&d| d < radius)
        .map_or(0.0, |d| config.prediction_weight * (1.0 - d / radius));

    Some(distance_term + overlap_term + lock_term + prediction_term)
}

/// Match scores of one detection against every role; 0 where the role is
/// empty, invalid, or out of range.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RoleScores(pub [f64; 3]);

impl RoleScores {
    pub fn get(&self, role: Role) -> f64 {
        self.0[role.index()]
    }

    pub fn set(&mut self, role: Role, score: f64) {
        self.0[role.index()] = score;
    }

    /// Highest-scoring role, if its score exceeds `accept`. Ties go to the
    /// higher-priority role.
    pub fn best(&self, accept: f64) -> Option<(Role, f64)> {
        let mut best = (Role::Head, self.get(Role::Head));
        for role in [Role::Primary, Role::Secondary] {
            let score = self.get(role);
            if score > best.1 {
                best = (role, score);
            }
        }
        (best.1 > accept).then_some(best)
    }
}

/// Score one detection against a set of role-labelled valid tracks.
pub fn score_roles<'a>(
    tracks: impl IntoIterator<Item = (Role, &'a Track)>,
    detection_box: &BBox,
    now: f64,
    config: &AssociationConfig,
) -> RoleScores {
    let center = detection_box.center();
    let mut scores = RoleScores::default();
    for (role, track) in tracks {
        if let Some(score) = match_score(track, detection_box, &center, now, config) {
            scores.set(role, score);
        }
    }
    scores
}

/// Best role for a detection under `config.best_role_accept_score`.
pub fn best_role(scores: &RoleScores, config: &AssociationConfig) -> Option<(Role, f64)> {
    scores.best(config.best_role_accept_score)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{track::TrackConfig, types::TrackId};
    use approx::assert_abs_diff_eq;

    fn track(bbox: BBox, created_at: f64) -> Track {
        Track::new(TrackId(0), bbox, 90.0, Role::Head, created_at, TrackConfig::default())
    }

    #[test]
    fn overlap_known_values() {
        let a = BBox::new(100, 100, 140, 140);
        let b = BBox::new(110, 100, 150, 140);
        assert_abs_diff_eq!(overlap(&a, &b), 0.6, epsilon = 1e-12);
        assert_abs_diff_eq!(overlap(&a, &a), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn overlap_touching_edges_is_zero() {
        let a = BBox::new(0, 0, 10, 10);
        let b = BBox::new(10, 0, 20, 10);
        assert_eq!(overlap(&a, &b), 0.0);
    }

    #[test]
    fn overlap_degenerate_boxes_are_zero() {
        let line = BBox::new(5, 0, 5, 10);
        let inverted = BBox::new(20, 0, 0, 10);
        let normal = BBox::new(0, 0, 10, 10);
        assert_eq!(overlap(&line, &line), 0.0);
        assert_eq!(overlap(&inverted, &normal), 0.0);
        assert_eq!(overlap(&normal, &inverted), 0.0);
    }

    #[test]
    fn match_score_components() {
        let cfg = AssociationConfig::default();
        let t = track(BBox::new(100, 100, 140, 140), 0.0);
        let det = BBox::new(110, 100, 150, 140);

        // locked (age 0): 0.3·(1 − 10/150) + 0.4·0.6 + 0.5
        let locked = match_score(&t, &det, &det.center(), 0.0, &cfg).unwrap();
        assert_abs_diff_eq!(locked, 0.28 + 0.24 + 0.5, epsilon = 1e-9);

        // unlocked once the lock window has passed
        let unlocked = match_score(&t, &det, &det.center(), 3.0, &cfg).unwrap();
        assert_abs_diff_eq!(unlocked, 0.28 + 0.24, epsilon = 1e-9);
    }

    #[test]
    fn match_score_outside_radius_is_none() {
        let cfg = AssociationConfig::default();
        let t = track(BBox::new(0, 0, 20, 20), 0.0);
        let det = BBox::new(150, 0, 170, 20);
        assert!(match_score(&t, &det, &det.center(), 0.0, &cfg).is_none());
    }

    #[test]
    fn prediction_bonus_applies_near_prediction() {
        let cfg = AssociationConfig::default();
        let mut t = track(BBox::new(0, 0, 20, 20), 0.0);
        t.predicted = Some(crate::types::Vec2::new(40.0, 10.0));
        let det = BBox::new(30, 0, 50, 20);
        let center = det.center();
        // distance 30, IoU 0, locked, prediction distance 0
        let score = match_score(&t, &det, &center, 0.0, &cfg).unwrap();
        assert_abs_diff_eq!(score, 0.3 * 0.8 + 0.5 + 0.6, epsilon = 1e-9);
    }

    #[test]
    fn best_role_threshold_and_ties() {
        let cfg = AssociationConfig::default();
        assert_eq!(best_role(&RoleScores([0.2, 0.1, 0.0]), &cfg), None);
        assert_eq!(
            best_role(&RoleScores([0.5, 0.5, 0.1]), &cfg),
            Some((Role::Head, 0.5))
        );
        assert_eq!(
            best_role(&RoleScores([0.0, 0.25, 0.7]), &cfg),
            Some((Role::Secondary, 0.7))
        );
    }

    #[test]
    fn score_roles_fills_only_reachable_roles() {
        let cfg = AssociationConfig::default();
        let near = track(BBox::new(0, 0, 20, 20), 0.0);
        let far = track(BBox::new(500, 500, 520, 520), 0.0);
        let det = BBox::new(2, 0, 22, 20);
        let scores = score_roles([(Role::Head, &far), (Role::Primary, &near)], &det, 0.0, &cfg);
        assert_eq!(scores.get(Role::Head), 0.0);
        assert!(scores.get(Role::Primary) > 0.5);
        assert_eq!(scores.get(Role::Secondary), 0.0);
    }
}
