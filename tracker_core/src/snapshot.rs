//! Read-only view of the slot state handed to rendering and telemetry.

use crate::{
    track::Track,
    types::{BBox, Point, Role, TrackId},
};
use serde::{Deserialize, Serialize};

/// Display state of one populated role.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackSnapshot {
    pub id: TrackId,
    pub role: Role,
    pub bbox: BBox,
    pub center: Point,
    /// Confidence on the 0–100 scale
    pub confidence: f64,
    /// Velocity in px/s
    pub velocity: [f64; 2],
    /// Lead-predicted center, once the track has enough history
    pub predicted: Option<[f64; 2]>,
    pub locked: bool,
}

impl TrackSnapshot {
    pub fn capture(track: &Track, now: f64) -> Self {
        Self {
            id: track.id,
            role: track.role,
            bbox: track.bbox,
            center: track.center(),
            confidence: track.confidence,
            velocity: [track.velocity.x, track.velocity.y],
            predicted: track.predicted.map(|p| [p.x, p.y]),
            locked: track.is_locked(now),
        }
    }
}

/// Valid roles in priority order, plus their count.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SlotSnapshot {
    pub timestamp: f64,
    pub tracks: Vec<TrackSnapshot>,
    /// Number of valid roles (0–3)
    pub active_count: usize,
}

impl SlotSnapshot {
    pub fn get(&self, role: Role) -> Option<&TrackSnapshot> {
        self.tracks.iter().find(|t| t.role == role)
    }

    pub fn head(&self) -> Option<&TrackSnapshot> {
        self.get(Role::Head)
    }
}
