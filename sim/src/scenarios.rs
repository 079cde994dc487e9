//! Scenario definitions.
//!
//! Each scenario is a named set of image-space targets plus the detector
//! behaviour used to observe them. All scenarios are deterministic given the
//! same seed.

use crate::{
    camera_sim::{SimCamera, SimDetector},
    target::{MotionSpec, Target},
};
use camera_models::DetectorParams;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

const WIDTH: u32 = 640;
const HEIGHT: u32 = 480;
const FPS: f64 = 30.0;
/// Width and height of a simulated target box (px)
const TARGET_SIZE: [f64; 2] = [40.0, 60.0];
/// Seeded offset applied to every start position (px)
const START_JITTER: f64 = 15.0;

/// Which pre-defined scenario to load.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, clap::ValueEnum)]
pub enum ScenarioKind {
    /// One target bouncing around the frame
    Single,
    /// Three targets bouncing, light clutter
    Trio,
    /// Three targets; the first one is hidden for one second
    Occlusion,
    /// Two targets crossing paths, a third one parked
    Crossing,
    /// Three targets under heavy false alarms
    Clutter,
    /// The first target leaves, the second one stays, a third arrives late
    Handover,
}

/// A fully configured simulation scenario.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub seed: u64,
    pub duration: f64, // seconds
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub targets: Vec<Target>,
    pub detector: DetectorParams,
}

impl Scenario {
    /// Build the named scenario. Uses `seed` for repeatability.
    pub fn build(kind: ScenarioKind, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed.wrapping_add(1));
        match kind {
            ScenarioKind::Single => Self::single(seed, &mut rng),
            ScenarioKind::Trio => Self::trio(seed, &mut rng),
            ScenarioKind::Occlusion => Self::occlusion(seed, &mut rng),
            ScenarioKind::Crossing => Self::crossing(seed, &mut rng),
            ScenarioKind::Clutter => Self::clutter(seed, &mut rng),
            ScenarioKind::Handover => Self::handover(seed, &mut rng),
        }
    }

    pub fn camera(&self) -> SimCamera {
        SimCamera::from_scenario(self)
    }

    pub fn detector(&self) -> SimDetector {
        SimDetector::new(self.detector.clone(), self.seed)
    }

    fn new(name: &str, seed: u64, duration: f64, targets: Vec<Target>) -> Self {
        Scenario {
            name: name.into(),
            seed,
            duration,
            fps: FPS,
            width: WIDTH,
            height: HEIGHT,
            targets,
            detector: DetectorParams::default(),
        }
    }

    // -----------------------------------------------------------------------
    // Scenario 1: Single
    // -----------------------------------------------------------------------
    fn single(seed: u64, rng: &mut ChaCha8Rng) -> Self {
        let targets = vec![bouncing(0, [320.0, 240.0], [45.0, 30.0], rng)];
        Self::new("single", seed, 10.0, targets)
    }

    // -----------------------------------------------------------------------
    // Scenario 2: Trio
    // -----------------------------------------------------------------------
    fn trio(seed: u64, rng: &mut ChaCha8Rng) -> Self {
        Self::new("trio", seed, 20.0, trio_targets(rng))
    }

    // -----------------------------------------------------------------------
    // Scenario 3: Occlusion
    // -----------------------------------------------------------------------
    fn occlusion(seed: u64, rng: &mut ChaCha8Rng) -> Self {
        let mut targets = trio_targets(rng);
        // The hidden target comes back on the same trajectory under the same ID
        let reappearing = targets[0].clone().visible_between(Some(6.0), None);
        targets[0].disappear_at = Some(5.0);
        targets.push(reappearing);
        Self::new("occlusion", seed, 15.0, targets)
    }

    // -----------------------------------------------------------------------
    // Scenario 4: Crossing
    // -----------------------------------------------------------------------
    fn crossing(seed: u64, rng: &mut ChaCha8Rng) -> Self {
        let targets = vec![
            drifting(0, [80.0, 240.0], [60.0, 0.0], rng),
            drifting(1, [560.0, 250.0], [-60.0, 0.0], rng),
            drifting(2, [320.0, 90.0], [0.0, 0.0], rng),
        ];
        Self::new("crossing", seed, 12.0, targets)
    }

    // -----------------------------------------------------------------------
    // Scenario 5: Clutter
    // -----------------------------------------------------------------------
    fn clutter(seed: u64, rng: &mut ChaCha8Rng) -> Self {
        let mut scenario = Self::new("clutter", seed, 20.0, trio_targets(rng));
        scenario.detector = DetectorParams {
            p_detection: 0.85,
            position_noise_px: 5.0,
            clutter_rate: 3.0,
            clutter_confidence_max: 0.7,
            ..DetectorParams::default()
        };
        scenario
    }

    // -----------------------------------------------------------------------
    // Scenario 6: Handover
    // -----------------------------------------------------------------------
    fn handover(seed: u64, rng: &mut ChaCha8Rng) -> Self {
        let leaving =
            bouncing(0, [200.0, 200.0], [35.0, 20.0], rng).visible_between(None, Some(8.0));
        let staying = bouncing(1, [450.0, 300.0], [-25.0, 30.0], rng);
        let late =
            bouncing(2, [320.0, 100.0], [40.0, -20.0], rng).visible_between(Some(3.0), None);
        Self::new("handover", seed, 15.0, vec![leaving, staying, late])
    }
}

fn trio_targets(rng: &mut ChaCha8Rng) -> Vec<Target> {
    vec![
        bouncing(0, [160.0, 120.0], [60.0, 30.0], rng),
        bouncing(1, [480.0, 140.0], [-50.0, 40.0], rng),
        bouncing(2, [320.0, 380.0], [30.0, -45.0], rng),
    ]
}

fn jittered(start: [f64; 2], rng: &mut ChaCha8Rng) -> [f64; 2] {
    [
        start[0] + rng.gen_range(-START_JITTER..START_JITTER),
        start[1] + rng.gen_range(-START_JITTER..START_JITTER),
    ]
}

fn bouncing(id: u64, start: [f64; 2], velocity: [f64; 2], rng: &mut ChaCha8Rng) -> Target {
    let motion = MotionSpec::Bounce {
        width: f64::from(WIDTH),
        height: f64::from(HEIGHT),
    };
    Target::new(id, jittered(start, rng), velocity, TARGET_SIZE, motion)
}

fn drifting(id: u64, start: [f64; 2], velocity: [f64; 2], rng: &mut ChaCha8Rng) -> Target {
    let motion = MotionSpec::Segmented {
        segments: vec![(0.0, velocity), (10.0, [velocity[1], velocity[0]])],
    };
    Target::new(id, jittered(start, rng), velocity, TARGET_SIZE, motion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::ValueEnum;

    #[test]
    fn every_scenario_builds_deterministically() {
        for kind in ScenarioKind::value_variants() {
            let a = Scenario::build(*kind, 3);
            let b = Scenario::build(*kind, 3);
            assert!(!a.targets.is_empty());
            assert_eq!(
                a.targets.iter().map(|t| t.center).collect::<Vec<_>>(),
                b.targets.iter().map(|t| t.center).collect::<Vec<_>>()
            );
            assert!(a.targets.iter().all(|t| t.center[0] > 0.0 && t.center[0] < 640.0));
        }
    }

    #[test]
    fn seed_moves_start_positions() {
        let a = Scenario::build(ScenarioKind::Trio, 1);
        let b = Scenario::build(ScenarioKind::Trio, 2);
        assert_ne!(a.targets[0].center, b.targets[0].center);
    }

    #[test]
    fn occlusion_hides_first_target_for_one_second() {
        let s = Scenario::build(ScenarioKind::Occlusion, 0);
        let visible = |t: f64| s.targets.iter().filter(|x| x.id == 0 && x.is_active(t)).count();
        assert_eq!(visible(4.9), 1);
        assert_eq!(visible(5.5), 0);
        assert_eq!(visible(6.0), 1);
    }
}
