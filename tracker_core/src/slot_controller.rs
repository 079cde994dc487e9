//! Three-slot controller: association, track creation, promotion, nearest-
//! neighbour reordering and periodic quality arbitration.
//!
//! # Slot policy
//! - **Slots**: exactly three, HEAD > PRIMARY > SECONDARY. A slot is empty or
//!   owns exactly one [`Track`]; role changes move tracks between slots.
//! - **Update**: greedy, in detection order. A detection updates the role with
//!   the best match score, provided that score clears the commit threshold and
//!   the role's track has not been updated yet this frame.
//! - **Creation**: leftover detections fill the highest free (or invalid) slot,
//!   keeping `min_separation` from the tracks already held.
//! - **Promotion**: invalid tracks are dropped and the survivors move up,
//!   keeping their relative order.
//! - **Reorder**: with all three slots valid, PRIMARY is the one nearer to HEAD.
//! - **Arbitration**: every `arbitration_period`, an unlocked PRIMARY whose
//!   quality beats an unlocked HEAD by `quality_margin` takes over HEAD, at most
//!   once per `role_change_debounce`.

use crate::{
    association::{best_role, score_roles, AssociationConfig, RoleScores},
    snapshot::{SlotSnapshot, TrackSnapshot},
    track::{Track, TrackConfig},
    types::{Detection, Point, Role, TrackId},
};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use tracing::{debug, info};

/// Configuration of the slot controller.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlotControllerConfig {
    /// Per-track smoothing and validity tuning
    pub track: TrackConfig,
    /// Association scoring tuning
    pub association: AssociationConfig,
    /// Minimum center distance between a new track and the tracks already held (px)
    pub min_separation: f64,
    /// Minimum detection confidence (0–100) to update or create anything
    pub creation_confidence_floor: f64,
    /// Quality arbitration cadence (s)
    pub arbitration_period: f64,
    /// Minimum time between role changes for arbitration to act (s)
    pub role_change_debounce: f64,
    /// Quality advantage PRIMARY needs over HEAD to take its place
    pub quality_margin: f64,
}

impl Default for SlotControllerConfig {
    fn default() -> Self {
        Self {
            track: TrackConfig::default(),
            association: AssociationConfig::default(),
            min_separation: 30.0,
            creation_confidence_floor: 40.0,
            arbitration_period: 5.0,
            role_change_debounce: 2.0,
            quality_margin: 30.0,
        }
    }
}

/// Counters of what happened to slots and detections during one step.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameEvents {
    pub updates: usize,
    pub creations: usize,
    pub misses: usize,
    pub promotions: usize,
    /// Invalid tracks removed without a replacement
    pub clears: usize,
    pub reorders: usize,
    pub arbitration_swaps: usize,
    /// Detections above the confidence floor that neither updated nor created a track
    pub dropped: usize,
    /// Detections below the confidence floor, or with no usable confidence
    pub ignored: usize,
}

impl AddAssign for FrameEvents {
    fn add_assign(&mut self, rhs: Self) {
        self.updates += rhs.updates;
        self.creations += rhs.creations;
        self.misses += rhs.misses;
        self.promotions += rhs.promotions;
        self.clears += rhs.clears;
        self.reorders += rhs.reorders;
        self.arbitration_swaps += rhs.arbitration_swaps;
        self.dropped += rhs.dropped;
        self.ignored += rhs.ignored;
    }
}

/// What a detection was used for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// Below the confidence floor
    Ignored,
    /// Folded into the track holding this role
    Updated(Role),
    /// Started a new track in this role
    Created(Role),
    /// Matched nothing and could not start a track
    Dropped,
}

/// Per-detection association record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectionOutcome {
    pub index: usize,
    /// Scores against the slots as they stood when the detection was examined
    pub scores: RoleScores,
    pub outcome: Outcome,
}

/// Result of [`SlotController::process`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FrameReport {
    pub events: FrameEvents,
    pub detections: Vec<DetectionOutcome>,
}

/// Owns the three role slots and the controller timers.
pub struct SlotController {
    pub config: SlotControllerConfig,
    slots: [Option<Track>; 3],
    last_big_check_at: f64,
    last_role_change_at: f64,
    next_id: u64,
}

impl SlotController {
    /// Create an empty controller. Both timers start at `now`.
    pub fn new(config: SlotControllerConfig, now: f64) -> Self {
        Self {
            config,
            slots: [None, None, None],
            last_big_check_at: now,
            last_role_change_at: now,
            next_id: 0,
        }
    }

    fn next_track_id(&mut self) -> TrackId {
        let id = TrackId(self.next_id);
        self.next_id += 1;
        id
    }

    /// Track held by `role`, valid or not.
    pub fn get(&self, role: Role) -> Option<&Track> {
        self.slots[role.index()].as_ref()
    }

    /// Track held by `role` if it is currently valid.
    pub fn valid(&self, role: Role, now: f64) -> Option<&Track> {
        self.get(role).filter(|t| t.is_valid(now))
    }

    /// Populated slots in priority order.
    pub fn tracks(&self) -> impl Iterator<Item = (Role, &Track)> + '_ {
        Role::ALL
            .into_iter()
            .filter_map(move |role| self.get(role).map(|t| (role, t)))
    }

    /// Number of roles holding a valid track.
    pub fn active_count(&self, now: f64) -> usize {
        Role::ALL
            .into_iter()
            .filter(|&role| self.valid(role, now).is_some())
            .count()
    }

    pub fn last_big_check_at(&self) -> f64 {
        self.last_big_check_at
    }

    pub fn last_role_change_at(&self) -> f64 {
        self.last_role_change_at
    }

    /// Display view of the valid roles.
    pub fn snapshot(&self, now: f64) -> SlotSnapshot {
        let tracks: Vec<TrackSnapshot> = Role::ALL
            .into_iter()
            .filter_map(|role| self.valid(role, now))
            .map(|t| TrackSnapshot::capture(t, now))
            .collect();
        SlotSnapshot {
            timestamp: now,
            active_count: tracks.len(),
            tracks,
        }
    }

    /// Empty all slots and restart both timers at `now`. Ids keep counting.
    pub fn reset(&mut self, now: f64) {
        self.slots = [None, None, None];
        self.last_big_check_at = now;
        self.last_role_change_at = now;
    }

    /// Scores of one detection against every valid slot.
    pub fn score_detection(&self, detection: &Detection, now: f64) -> RoleScores {
        let valid = Role::ALL
            .into_iter()
            .filter_map(|role| self.valid(role, now).map(|t| (role, t)));
        score_roles(valid, &detection.bbox, now, &self.config.association)
    }

    /// Run one frame of detections through update, creation, promotion, miss
    /// and reorder, in that order.
    pub fn process(&mut self, detections: &[Detection], now: f64) -> FrameReport {
        let mut events = FrameEvents::default();
        let mut scores = vec![RoleScores::default(); detections.len()];
        let mut outcomes: Vec<Option<Outcome>> = vec![None; detections.len()];
        // Tracks updated or created this frame; ids survive slot moves.
        let mut touched: Vec<TrackId> = Vec::with_capacity(3);
        let floor = self.config.creation_confidence_floor;
        let accept = self.config.association.match_accept_score;

        // Update pass
        for (i, det) in detections.iter().enumerate() {
            let confidence = det.confidence_pct();
            if !confidence.is_finite() || confidence < floor {
                outcomes[i] = Some(Outcome::Ignored);
                events.ignored += 1;
                continue;
            }

            scores[i] = self.score_detection(det, now);
            let Some((role, score)) = best_role(&scores[i], &self.config.association) else {
                continue;
            };
            if score <= accept {
                continue;
            }
            let Some(track) = self.slots[role.index()].as_mut() else {
                continue;
            };
            if !track.is_valid(now) || touched.contains(&track.id) {
                continue;
            }

            track.update(det.bbox, confidence, now);
            touched.push(track.id);
            outcomes[i] = Some(Outcome::Updated(role));
            events.updates += 1;
        }

        // Creation pass
        for (i, det) in detections.iter().enumerate() {
            if outcomes[i].is_some() {
                continue;
            }
            let center = det.bbox.center();
            match self.creation_role(&center, now) {
                Some(role) => {
                    let id = self.create(role, det, now);
                    touched.push(id);
                    outcomes[i] = Some(Outcome::Created(role));
                    events.creations += 1;
                }
                None => {
                    debug!(index = i, x = center.x, y = center.y, "detection dropped");
                    outcomes[i] = Some(Outcome::Dropped);
                    events.dropped += 1;
                }
            }
        }

        self.promote(now, &mut events);

        // Miss pass
        for track in self.slots.iter_mut().flatten() {
            if track.is_valid(now) && !touched.contains(&track.id) {
                track.mark_missed();
                events.misses += 1;
            }
        }

        self.reorder(now, &mut events);

        let detections = scores
            .into_iter()
            .zip(outcomes)
            .enumerate()
            .map(|(index, (scores, outcome))| DetectionOutcome {
                index,
                scores,
                outcome: outcome.unwrap_or(Outcome::Dropped),
            })
            .collect();
        FrameReport { events, detections }
    }

    /// Drop invalid tracks, promote the survivors, then reorder. Idempotent.
    pub fn reconcile(&mut self, now: f64) -> FrameEvents {
        let mut events = FrameEvents::default();
        self.promote(now, &mut events);
        self.reorder(now, &mut events);
        events
    }

    /// Periodic quality arbitration between HEAD and PRIMARY. Returns true on a swap.
    pub fn arbitrate(&mut self, now: f64) -> bool {
        if now - self.last_big_check_at < self.config.arbitration_period {
            return false;
        }
        self.last_big_check_at = now;

        if now - self.last_role_change_at < self.config.role_change_debounce {
            return false;
        }
        let (Some(head), Some(primary)) = (self.valid(Role::Head, now), self.valid(Role::Primary, now))
        else {
            return false;
        };
        if head.is_locked(now) || primary.is_locked(now) {
            return false;
        }

        let head_quality = head.quality_score(now);
        let primary_quality = primary.quality_score(now);
        if primary_quality <= head_quality + self.config.quality_margin {
            return false;
        }

        info!(
            head = %primary.id,
            primary = %head.id,
            head_quality,
            primary_quality,
            "quality arbitration swapped HEAD and PRIMARY"
        );
        self.slots.swap(Role::Head.index(), Role::Primary.index());
        self.sync_roles();
        self.last_role_change_at = now;
        true
    }

    /// Highest free-or-invalid role a new track at `center` may take.
    fn creation_role(&self, center: &Point, now: f64) -> Option<Role> {
        let min_separation = self.config.min_separation;
        let separated = |role: Role| {
            self.valid(role, now)
                .map_or(true, |t| t.distance_to_point(center) > min_separation)
        };

        let head = self.valid(Role::Head, now);
        if head.is_none() {
            return Some(Role::Head);
        }
        if self.valid(Role::Primary, now).is_none() && separated(Role::Head) {
            return Some(Role::Primary);
        }
        if self.valid(Role::Secondary, now).is_none()
            && separated(Role::Head)
            && separated(Role::Primary)
        {
            return Some(Role::Secondary);
        }
        None
    }

    fn create(&mut self, role: Role, det: &Detection, now: f64) -> TrackId {
        let id = self.next_track_id();
        let track = Track::new(id, det.bbox, det.confidence_pct(), role, now, self.config.track);
        let center = track.center();
        if let Some(old) = self.slots[role.index()].replace(track) {
            debug!(track = %old.id, %role, "invalid track replaced");
        }
        self.last_role_change_at = now;
        info!(track = %id, %role, x = center.x, y = center.y, "track created");
        id
    }

    /// Pack valid tracks into the highest roles, preserving their order.
    fn promote(&mut self, now: f64, events: &mut FrameEvents) {
        let mut survivors: Vec<Track> = Vec::with_capacity(3);
        for role in Role::ALL {
            if let Some(track) = self.slots[role.index()].take() {
                if track.is_valid(now) {
                    survivors.push(track);
                } else {
                    debug!(track = %track.id, %role, "invalid track cleared");
                    events.clears += 1;
                }
            }
        }

        for (role, mut track) in Role::ALL.into_iter().zip(survivors) {
            if track.role != role {
                info!(track = %track.id, from = %track.role, to = %role, "track promoted");
                if role == Role::Head {
                    self.last_role_change_at = now;
                }
                track.role = role;
                events.promotions += 1;
            }
            self.slots[role.index()] = Some(track);
        }
    }

    /// With all three slots valid, keep the track nearer to HEAD in PRIMARY.
    fn reorder(&mut self, now: f64, events: &mut FrameEvents) {
        let (Some(head), Some(primary), Some(secondary)) = (
            self.valid(Role::Head, now),
            self.valid(Role::Primary, now),
            self.valid(Role::Secondary, now),
        ) else {
            return;
        };

        let primary_distance = head.distance_to(primary);
        let secondary_distance = head.distance_to(secondary);
        if secondary_distance < primary_distance {
            debug!(
                primary = %secondary.id,
                secondary = %primary.id,
                primary_distance,
                secondary_distance,
                "reordered PRIMARY and SECONDARY"
            );
            self.slots
                .swap(Role::Primary.index(), Role::Secondary.index());
            self.sync_roles();
            events.reorders += 1;
        }
    }

    fn sync_roles(&mut self) {
        for (role, slot) in Role::ALL.into_iter().zip(self.slots.iter_mut()) {
            if let Some(track) = slot {
                track.role = role;
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
