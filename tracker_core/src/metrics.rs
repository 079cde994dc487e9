//! Tracking metrics: center RMSE, precision/recall, identity switches and
//! HEAD changes, measured against simulator ground truth.

use crate::{
    snapshot::SlotSnapshot,
    types::{Point, Role, TrackId},
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Default association gate between a role and a ground-truth target (px).
pub const DEFAULT_GATE_PX: f64 = 60.0;

/// Ground-truth position of one target in one frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundTruth {
    /// True target ID (from simulator)
    pub target_id: u64,
    pub center: Point,
}

/// Accumulated metric statistics.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TrackingMetrics {
    /// Maximum center distance for a role to count as covering a target
    pub gate_px: f64,
    /// Number of frames evaluated
    pub n_frames: u64,
    /// Total number of matched (role, target) pairs
    pub n_matched: u64,
    /// Sum of squared center errors (for RMSE)
    pub sum_sq_center_err: f64,
    /// Roles matched to a target
    pub true_positives: u64,
    /// Roles with no target inside the gate
    pub false_positives: u64,
    /// Targets left uncovered while a role was free
    pub false_negatives: u64,
    /// A track went from following one target to following another
    pub identity_switches: u64,
    /// HEAD passed to a different track
    pub head_changes: u64,
    #[serde(skip)]
    last_target: HashMap<TrackId, u64>,
    #[serde(skip)]
    last_head: Option<TrackId>,
}

impl Default for TrackingMetrics {
    fn default() -> Self {
        Self::new(DEFAULT_GATE_PX)
    }
}

impl TrackingMetrics {
    pub fn new(gate_px: f64) -> Self {
        Self {
            gate_px,
            n_frames: 0,
            n_matched: 0,
            sum_sq_center_err: 0.0,
            true_positives: 0,
            false_positives: 0,
            false_negatives: 0,
            identity_switches: 0,
            head_changes: 0,
            last_target: HashMap::new(),
            last_head: None,
        }
    }

    /// Root-mean-square center error (px).
    pub fn rmse_center(&self) -> f64 {
        if self.n_matched == 0 {
            return 0.0;
        }
        (self.sum_sq_center_err / self.n_matched as f64).sqrt()
    }

    /// Precision = TP / (TP + FP)
    pub fn precision(&self) -> f64 {
        let denom = (self.true_positives + self.false_positives) as f64;
        if denom == 0.0 { 1.0 } else { self.true_positives as f64 / denom }
    }

    /// Recall = TP / (TP + FN)
    pub fn recall(&self) -> f64 {
        let denom = (self.true_positives + self.false_negatives) as f64;
        if denom == 0.0 { 1.0 } else { self.true_positives as f64 / denom }
    }

    /// Accumulate one frame. Roles claim their nearest unclaimed target in
    /// priority order. Identity state is kept only for tracks in `snapshot`.
    pub fn accumulate(&mut self, snapshot: &SlotSnapshot, truths: &[GroundTruth]) {
        self.n_frames += 1;
        let mut claimed = vec![false; truths.len()];

        for track in &snapshot.tracks {
            let nearest = truths
                .iter()
                .enumerate()
                .filter(|(i, _)| !claimed[*i])
                .map(|(i, gt)| (i, track.center.distance_to(&gt.center)))
                .filter(|&(_, d)| d <= self.gate_px)
                .min_by(|a, b| a.1.total_cmp(&b.1));

            let Some((i, err)) = nearest else {
                self.false_positives += 1;
                continue;
            };
            claimed[i] = true;
            self.true_positives += 1;
            self.n_matched += 1;
            self.sum_sq_center_err += err * err;

            let target = truths[i].target_id;
            if let Some(prev) = self.last_target.insert(track.id, target) {
                if prev != target {
                    self.identity_switches += 1;
                }
            }
        }

        self.last_target
            .retain(|id, _| snapshot.tracks.iter().any(|t| t.id == *id));

        let free_roles = Role::ALL.len().saturating_sub(snapshot.tracks.len());
        let uncovered = claimed.iter().filter(|c| !**c).count();
        self.false_negatives += uncovered.min(free_roles) as u64;

        if let Some(head) = snapshot.head().map(|t| t.id) {
            if self.last_head.is_some_and(|prev| prev != head) {
                self.head_changes += 1;
            }
            self.last_head = Some(head);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{snapshot::TrackSnapshot, types::BBox};
    use approx::assert_abs_diff_eq;

    fn role(id: u64, role: Role, cx: i32, cy: i32) -> TrackSnapshot {
        TrackSnapshot {
            id: TrackId(id),
            role,
            bbox: BBox::new(cx - 10, cy - 10, cx + 10, cy + 10),
            center: Point::new(cx, cy),
            confidence: 90.0,
            velocity: [0.0, 0.0],
            predicted: None,
            locked: false,
        }
    }

    fn snapshot(tracks: Vec<TrackSnapshot>) -> SlotSnapshot {
        SlotSnapshot {
            timestamp: 0.0,
            active_count: tracks.len(),
            tracks,
        }
    }

    fn gt(target_id: u64, x: i32, y: i32) -> GroundTruth {
        GroundTruth {
            target_id,
            center: Point::new(x, y),
        }
    }

    #[test]
    fn matched_roles_and_errors() {
        let mut m = TrackingMetrics::default();
        let snap = snapshot(vec![role(0, Role::Head, 100, 100), role(1, Role::Primary, 500, 500)]);
        m.accumulate(&snap, &[gt(7, 103, 104), gt(8, 300, 300)]);

        assert_eq!(m.true_positives, 1);
        assert_eq!(m.false_positives, 1);
        assert_eq!(m.false_negatives, 1);
        assert_abs_diff_eq!(m.rmse_center(), 5.0, epsilon = 1e-12);
        assert_abs_diff_eq!(m.precision(), 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(m.recall(), 0.5, epsilon = 1e-12);
    }

    #[test]
    fn identity_switch_and_head_change() {
        let mut m = TrackingMetrics::default();
        m.accumulate(&snapshot(vec![role(0, Role::Head, 100, 100)]), &[gt(1, 100, 100), gt(2, 140, 100)]);
        m.accumulate(&snapshot(vec![role(0, Role::Head, 140, 100)]), &[gt(1, 80, 100), gt(2, 140, 100)]);
        assert_eq!(m.identity_switches, 1);
        assert_eq!(m.head_changes, 0);

        m.accumulate(&snapshot(vec![role(3, Role::Head, 140, 100)]), &[gt(2, 140, 100)]);
        assert_eq!(m.head_changes, 1);
        assert_eq!(m.n_frames, 3);
    }

    #[test]
    fn identity_state_follows_live_tracks() {
        let mut m = TrackingMetrics::default();
        let truth = [gt(1, 100, 100), gt(2, 300, 100)];
        m.accumulate(
            &snapshot(vec![role(0, Role::Head, 100, 100), role(1, Role::Primary, 300, 100)]),
            &truth,
        );
        assert_eq!(m.last_target.len(), 2);

        m.accumulate(&snapshot(vec![role(1, Role::Head, 300, 100)]), &truth);
        assert_eq!(m.last_target.len(), 1);
        assert!(m.last_target.contains_key(&TrackId(1)));

        // A track that covers nothing keeps its last target
        m.accumulate(&snapshot(vec![role(1, Role::Head, 500, 400)]), &truth);
        assert_eq!(m.last_target.get(&TrackId(1)), Some(&2));
        assert_eq!(m.identity_switches, 0);

        m.accumulate(&snapshot(vec![]), &truth);
        assert!(m.last_target.is_empty());
    }

    #[test]
    fn empty_frames_are_perfect() {
        let m = TrackingMetrics::default();
        assert_eq!(m.precision(), 1.0);
        assert_eq!(m.recall(), 1.0);
        assert_eq!(m.rmse_center(), 0.0);
    }
}
