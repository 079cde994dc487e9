//! Track: smoothed box, confidence, hit/miss bookkeeping, position history,
//! velocity and lead prediction for one target candidate.

use crate::types::{BBox, Point, Role, TrackId, Vec2};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Cap on the hit-count term of the quality score.
const QUALITY_HITS_CAP: f64 = 50.0;
/// Confidence above which the quality score starts rewarding confidence.
const QUALITY_CONFIDENCE_PIVOT: f64 = 50.0;
/// Quality bonus for a locked track.
const QUALITY_LOCK_BONUS: f64 = 100.0;

/// Per-track tuning. Times are in seconds, confidences on the 0–100 scale.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackConfig {
    /// Age below which a track is locked against quality arbitration
    pub lock_duration: f64,
    /// Total hits above which a track is locked regardless of age
    pub lock_hit_bonus: u32,
    /// Consecutive misses at which a track becomes invalid
    pub max_misses: u32,
    /// Confidence floor for validity
    pub min_confidence: f64,
    /// Maximum time since the last hit for validity
    pub stale_timeout: f64,
    /// Weight on the old geometry when smoothing a new box in
    pub smoothing_alpha: f64,
    /// Weight on the old confidence when blending a new reading in
    pub confidence_blend: f64,
    /// Confidence multiplier applied on every miss
    pub confidence_decay: f64,
    /// Stability saturation value
    pub stability_max: u32,
    /// Stability gained per hit
    pub stability_hit_gain: u32,
    /// Stability lost per miss
    pub stability_miss_penalty: u32,
    /// Look-ahead time for the lead prediction
    pub prediction_horizon: f64,
    /// Amplification applied on top of the look-ahead
    pub prediction_gain: f64,
    /// Number of center samples kept
    pub history_capacity: usize,
    /// Samples required before velocity is estimated
    pub min_history_for_velocity: usize,
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            lock_duration: 2.0,
            lock_hit_bonus: 15,
            max_misses: 2,
            min_confidence: 30.0,
            stale_timeout: 2.0,
            smoothing_alpha: 0.6,
            confidence_blend: 0.8,
            confidence_decay: 0.95,
            stability_max: 100,
            stability_hit_gain: 1,
            stability_miss_penalty: 2,
            prediction_horizon: 0.15,
            prediction_gain: 40.0,
            history_capacity: 8,
            min_history_for_velocity: 3,
        }
    }
}

/// One center sample of the position history.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct HistorySample {
    pub center: Point,
    pub time: f64,
}

/// A single tracked target candidate.
#[derive(Clone, Debug)]
pub struct Track {
    /// Unique identifier
    pub id: TrackId,
    /// Smoothed bounding box
    pub bbox: BBox,
    /// Smoothed confidence, 0–100
    pub confidence: f64,
    /// Current role label (kept in sync with the slot holding the track)
    pub role: Role,
    /// Time of creation
    pub created_at: f64,
    /// Time of the last matched detection
    pub last_seen_at: f64,
    /// Consecutive matched frames
    pub hit_streak: u32,
    /// Consecutive missed frames
    pub miss_streak: u32,
    /// Matched frames since creation
    pub total_hits: u32,
    /// Saturating hit/miss counter
    pub stability: u32,
    /// Recent centers, oldest first
    pub history: VecDeque<HistorySample>,
    /// Estimated velocity (px/s), zero until enough history exists
    pub velocity: Vec2,
    /// Lead-predicted center, set once velocity has been estimated
    pub predicted: Option<Vec2>,
    config: TrackConfig,
}

impl Track {
    /// Create a track from its first detection. `confidence` is on the 0–100 scale.
    pub fn new(
        id: TrackId,
        bbox: BBox,
        confidence: f64,
        role: Role,
        now: f64,
        config: TrackConfig,
    ) -> Self {
        let mut history = VecDeque::with_capacity(config.history_capacity);
        history.push_back(HistorySample {
            center: bbox.center(),
            time: now,
        });
        Self {
            id,
            bbox,
            confidence,
            role,
            created_at: now,
            last_seen_at: now,
            hit_streak: 0,
            miss_streak: 0,
            total_hits: 0,
            stability: 0,
            history,
            velocity: Vec2::zeros(),
            predicted: None,
            config,
        }
    }

    pub fn center(&self) -> Point {
        self.bbox.center()
    }

    /// Distance between the centers of two tracks.
    pub fn distance_to(&self, other: &Track) -> f64 {
        self.center().distance_to(&other.center())
    }

    pub fn distance_to_point(&self, point: &Point) -> f64 {
        self.center().distance_to(point)
    }

    pub fn age(&self, now: f64) -> f64 {
        now - self.created_at
    }

    pub fn time_since_seen(&self, now: f64) -> f64 {
        now - self.last_seen_at
    }

    /// Locked tracks cannot lose their role to quality arbitration.
    pub fn is_locked(&self, now: f64) -> bool {
        self.age(now) < self.config.lock_duration || self.total_hits > self.config.lock_hit_bonus
    }

    /// Fold a matched detection into the track. `confidence` is on the 0–100 scale.
    pub fn update(&mut self, bbox: BBox, confidence: f64, now: f64) {
        let alpha = self.config.smoothing_alpha;
        let smooth = |old: i32, new: i32| -> i32 {
            (f64::from(old) * alpha + f64::from(new) * (1.0 - alpha)).round() as i32
        };
        self.bbox = BBox::new(
            smooth(self.bbox.x1, bbox.x1),
            smooth(self.bbox.y1, bbox.y1),
            smooth(self.bbox.x2, bbox.x2),
            smooth(self.bbox.y2, bbox.y2),
        );

        let blend = self.config.confidence_blend;
        self.confidence = (self.confidence * blend + confidence * (1.0 - blend)).max(confidence);
        self.last_seen_at = now;

        self.miss_streak = 0;
        self.hit_streak += 1;
        self.total_hits += 1;
        self.stability =
            (self.stability + self.config.stability_hit_gain).min(self.config.stability_max);

        self.push_history(now);
        self.update_motion();
    }

    /// Register a frame without a matching detection. Geometry is left untouched.
    pub fn mark_missed(&mut self) {
        self.miss_streak += 1;
        self.hit_streak = 0;
        self.confidence *= self.config.confidence_decay;
        self.stability = self
            .stability
            .saturating_sub(self.config.stability_miss_penalty);
    }

    /// A track is valid until it misses too often, fades below the confidence
    /// floor, or goes unseen for too long.
    pub fn is_valid(&self, now: f64) -> bool {
        if self.miss_streak >= self.config.max_misses {
            return false;
        }
        if self.confidence < self.config.min_confidence {
            return false;
        }
        self.time_since_seen(now) <= self.config.stale_timeout
    }

    /// Relative ranking metric. Only meaningful when comparing two tracks.
    pub fn quality_score(&self, now: f64) -> f64 {
        let hits = (f64::from(self.total_hits) * 2.0).min(QUALITY_HITS_CAP);
        let confidence = (self.confidence - QUALITY_CONFIDENCE_PIVOT).max(0.0);
        let lock = if self.is_locked(now) {
            QUALITY_LOCK_BONUS
        } else {
            0.0
        };
        hits + f64::from(self.stability) + confidence + lock
    }

    fn push_history(&mut self, now: f64) {
        if self.history.len() >= self.config.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(HistorySample {
            center: self.center(),
            time: now,
        });
    }

    /// Average velocity over the history; pairs with no elapsed time are skipped.
    /// Velocity and prediction keep their previous values when there is not
    /// enough history or no time has passed.
    fn update_motion(&mut self) {
        if self.history.len() < self.config.min_history_for_velocity {
            return;
        }

        let mut sum_dx = 0.0;
        let mut sum_dy = 0.0;
        let mut sum_dt = 0.0;
        for (a, b) in self.history.iter().zip(self.history.iter().skip(1)) {
            let dt = b.time - a.time;
            if dt > 0.0 {
                sum_dx += f64::from(b.center.x - a.center.x);
                sum_dy += f64::from(b.center.y - a.center.y);
                sum_dt += dt;
            }
        }
        if sum_dt <= 0.0 {
            return;
        }

        self.velocity = Vec2::new(sum_dx / sum_dt, sum_dy / sum_dt);
        let lead = self.config.prediction_horizon * self.config.prediction_gain;
        self.predicted = Some(self.center().to_vec2() + self.velocity * lead);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
