//! `sim` — Scenario simulator: image-space targets, simulated camera and
//! detector, replay.

pub mod camera_sim;
pub mod replay;
pub mod scenarios;
pub mod target;

pub use camera_sim::{SimCamera, SimDetector, SimFrame};
pub use replay::{load_replay, record, save_replay, GroundTruthFrame, ReplayLog, TargetState};
pub use scenarios::{Scenario, ScenarioKind};
pub use target::{MotionSpec, Target};
