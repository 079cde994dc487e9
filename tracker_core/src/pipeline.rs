//! Pipeline orchestrator: the full tracking cycle for one frame.
//!
//! # Processing steps per frame
//! 1. Association: update slots from matching detections
//! 2. Creation of new tracks from leftover detections
//! 3. Promotion of survivors over invalid slots
//! 4. Miss registration for slots without a detection
//! 5. Nearest-neighbour reorder of PRIMARY / SECONDARY
//! 6. Unconditional per-frame reconcile (promotion + reorder)
//! 7. Periodic quality arbitration
//! 8. Snapshot for rendering / telemetry
//!
//! Steps 1–5 are [`SlotController::process`]; the whole cycle runs to
//! completion before the next frame is accepted.

use crate::{
    slot_controller::{DetectionOutcome, FrameEvents, SlotController, SlotControllerConfig},
    snapshot::SlotSnapshot,
    types::FrameDetections,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Configuration for the tracking pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Slot, track and association tuning
    pub slots: SlotControllerConfig,
    /// Keep per-detection scores and stage timings in the output
    pub collect_debug: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            slots: SlotControllerConfig::default(),
            collect_debug: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Debug Data
// ---------------------------------------------------------------------------

/// Intermediate data produced in one pipeline step.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineDebugData {
    /// Role scores and outcome for every detection of the frame
    pub detections: Vec<DetectionOutcome>,
    /// Timings in microseconds
    pub timing_process_us: u64,
    pub timing_reconcile_us: u64,
    pub timing_arbitrate_us: u64,
}

/// Outputs of one pipeline step.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PipelineOutput {
    pub frame_index: u64,
    /// Valid roles after the step
    pub snapshot: SlotSnapshot,
    /// Everything that happened during the step
    pub events: FrameEvents,
    /// True if quality arbitration swapped HEAD and PRIMARY
    pub arbitrated: bool,
    /// Populated only when `collect_debug` is set
    pub debug: PipelineDebugData,
    /// Wall-clock time of processing
    pub total_time_us: u64,
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

/// The tracking pipeline. Owns the slot controller.
pub struct Pipeline {
    pub config: PipelineConfig,
    pub controller: SlotController,
    frames_processed: u64,
}

impl Pipeline {
    /// Create a pipeline whose controller timers start at `start_time`.
    pub fn new(config: PipelineConfig, start_time: f64) -> Self {
        Self {
            config,
            controller: SlotController::new(config.slots, start_time),
            frames_processed: 0,
        }
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Process one frame of detections and return the resulting snapshot.
    pub fn process_frame(&mut self, frame: &FrameDetections) -> PipelineOutput {
        let start_total = Instant::now();
        let now = frame.timestamp;
        let mut debug = PipelineDebugData::default();

        let t0 = Instant::now();
        let report = self.controller.process(&frame.detections, now);
        debug.timing_process_us = t0.elapsed().as_micros() as u64;
        let mut events = report.events;

        let t0 = Instant::now();
        events += self.controller.reconcile(now);
        debug.timing_reconcile_us = t0.elapsed().as_micros() as u64;

        let t0 = Instant::now();
        let arbitrated = self.controller.arbitrate(now);
        if arbitrated {
            events.arbitration_swaps += 1;
        }
        debug.timing_arbitrate_us = t0.elapsed().as_micros() as u64;

        if self.config.collect_debug {
            debug.detections = report.detections;
        } else {
            debug = PipelineDebugData::default();
        }

        self.frames_processed += 1;
        PipelineOutput {
            frame_index: frame.frame_index,
            snapshot: self.controller.snapshot(now),
            events,
            arbitrated,
            debug,
            total_time_us: start_total.elapsed().as_micros() as u64,
        }
    }

    /// Reset: clear all slots and restart the timers at `now`.
    pub fn reset(&mut self, now: f64) {
        self.controller.reset(now);
        self.frames_processed = 0;
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
