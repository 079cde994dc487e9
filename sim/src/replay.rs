//! Replay: record detector output with ground truth, and (de)serialize the
//! log for offline evaluation.

use crate::{camera_sim::SimFrame, scenarios::Scenario};
use camera_models::{Detector, Frame, FrameSource};
use serde::{Deserialize, Serialize};
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracker_core::{metrics::GroundTruth, BBox, FrameDetections};

/// A full recorded simulation log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReplayLog {
    pub scenario_name: String,
    pub seed: u64,
    pub fps: f64,
    /// Detector output for every frame, in order
    pub frames: Vec<FrameDetections>,
    /// Ground truth, one entry per frame
    pub ground_truth: Vec<GroundTruthFrame>,
}

impl ReplayLog {
    /// Empty log for `scenario`.
    pub fn new(scenario: &Scenario) -> Self {
        Self {
            scenario_name: scenario.name.clone(),
            seed: scenario.seed,
            fps: scenario.fps,
            frames: Vec::new(),
            ground_truth: Vec::new(),
        }
    }

    /// Append one frame's detector output and the truth it was drawn from.
    pub fn push(&mut self, frame: &SimFrame, detections: FrameDetections) {
        self.frames.push(detections);
        self.ground_truth.push(GroundTruthFrame {
            frame_index: frame.index(),
            time: frame.timestamp(),
            targets: frame.truth.clone(),
        });
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GroundTruthFrame {
    pub frame_index: u64,
    pub time: f64,
    pub targets: Vec<TargetState>,
}

impl GroundTruthFrame {
    pub fn ground_truth(&self) -> Vec<GroundTruth> {
        self.targets.iter().map(TargetState::ground_truth).collect()
    }
}

/// True box of one visible target.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TargetState {
    pub id: u64,
    pub bbox: BBox,
}

impl TargetState {
    pub fn ground_truth(&self) -> GroundTruth {
        GroundTruth {
            target_id: self.id,
            center: self.bbox.center(),
        }
    }
}

/// Run the scenario's camera and detector to completion, without tracking.
pub fn record(scenario: &Scenario) -> anyhow::Result<ReplayLog> {
    let mut camera = scenario.camera();
    let mut detector = scenario.detector();
    let mut log = ReplayLog::new(scenario);

    while let Some(frame) = camera.next_frame()? {
        let detections = FrameDetections {
            frame_index: frame.index(),
            timestamp: frame.timestamp(),
            detections: detector.detect(&frame)?,
        };
        log.push(&frame, detections);
    }
    Ok(log)
}

/// Save a replay log to a JSON file.
pub fn save_replay(log: &ReplayLog, path: &Path) -> anyhow::Result<()> {
    let file = std::fs::File::create(path)?;
    let writer = BufWriter::new(file);
    serde_json::to_writer_pretty(writer, log)?;
    Ok(())
}

/// Load a replay log from a JSON file.
pub fn load_replay(path: &Path) -> anyhow::Result<ReplayLog> {
    let file = std::fs::File::open(path)?;
    let reader = BufReader::new(file);
    let log: ReplayLog = serde_json::from_reader(reader)?;
    anyhow::ensure!(
        log.frames.len() == log.ground_truth.len(),
        "replay {} has {} frames but {} ground-truth entries",
        path.display(),
        log.frames.len(),
        log.ground_truth.len()
    );
    Ok(log)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::ScenarioKind;

    #[test]
    fn recording_is_deterministic() {
        let scenario = Scenario::build(ScenarioKind::Clutter, 7);
        let a = record(&scenario).unwrap();
        let b = record(&Scenario::build(ScenarioKind::Clutter, 7)).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.frames.len(), a.ground_truth.len());
        assert_eq!(a.frames.len() as f64, (scenario.duration * scenario.fps).floor() + 1.0);

        let c = record(&Scenario::build(ScenarioKind::Clutter, 8)).unwrap();
        assert_ne!(a.frames, c.frames);
    }

    #[test]
    fn driver_run_logs_the_same_frames_as_record() {
        let mut scenario = Scenario::build(ScenarioKind::Trio, 4);
        scenario.duration = 2.0;
        let recorded = record(&scenario).unwrap();

        let mut pipeline = tracker_core::Pipeline::new(tracker_core::PipelineConfig::default(), 0.0);
        let mut driver = camera_models::FrameDriver::new(scenario.camera(), scenario.detector());
        let mut log = ReplayLog::new(&scenario);
        let frames = driver
            .run(&mut pipeline, None, |frame, detections, _| {
                log.push(frame, detections.clone())
            })
            .unwrap();

        assert_eq!(frames as usize, recorded.frames.len());
        assert_eq!(log, recorded);
    }

    #[test]
    fn save_and_load_preserve_the_log() {
        let mut scenario = Scenario::build(ScenarioKind::Single, 1);
        scenario.duration = 1.0;
        let log = record(&scenario).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("single.json");
        save_replay(&log, &path).unwrap();
        let loaded = load_replay(&path).unwrap();

        assert_eq!(loaded.scenario_name, "single");
        assert_eq!(loaded.frames.len(), log.frames.len());
        assert_eq!(loaded.ground_truth, log.ground_truth);
        assert_eq!(loaded.frames[5].detections.len(), log.frames[5].detections.len());
    }

    #[test]
    fn load_rejects_truncated_ground_truth() {
        let mut scenario = Scenario::build(ScenarioKind::Single, 1);
        scenario.duration = 0.5;
        let mut log = record(&scenario).unwrap();
        log.ground_truth.pop();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        save_replay(&log, &path).unwrap();
        assert!(load_replay(&path).is_err());
    }
}
