//! Simulated camera and box detector.
//!
//! The camera steps the scenario targets at a fixed frame rate and hands out
//! frames carrying their ground truth. The detector turns that truth into
//! noisy boxes:
//! - per-target miss with probability 1 - P_D
//! - uniform center and size jitter
//! - confidence sampled around a mean, clamped to [0, 1]
//! - Poisson clutter (false alarms) anywhere in the image

use crate::{replay::TargetState, scenarios::Scenario, target::Target};
use camera_models::{Detector, DetectorParams, Frame, FrameSource};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::convert::Infallible;
use tracker_core::Detection;

/// Smallest box side the detector reports (px).
const MIN_BOX_SIDE: f64 = 2.0;
/// Upper bound on clutter boxes per frame.
const MAX_CLUTTER: usize = 50;

/// One simulated frame: timing, image size and the visible targets.
#[derive(Clone, Debug, PartialEq)]
pub struct SimFrame {
    pub index: u64,
    pub timestamp: f64,
    pub width: u32,
    pub height: u32,
    /// Targets visible in this frame
    pub truth: Vec<TargetState>,
}

impl Frame for SimFrame {
    fn index(&self) -> u64 {
        self.index
    }

    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}

/// Fixed-rate camera over a set of moving targets.
pub struct SimCamera {
    targets: Vec<Target>,
    fps: f64,
    last_index: u64,
    width: u32,
    height: u32,
    next_index: u64,
}

impl SimCamera {
    pub fn new(targets: Vec<Target>, fps: f64, duration: f64, width: u32, height: u32) -> Self {
        Self {
            targets,
            fps,
            last_index: (duration * fps).floor().max(0.0) as u64,
            width,
            height,
            next_index: 0,
        }
    }

    pub fn from_scenario(scenario: &Scenario) -> Self {
        Self::new(
            scenario.targets.clone(),
            scenario.fps,
            scenario.duration,
            scenario.width,
            scenario.height,
        )
    }

    fn time_of(&self, index: u64) -> f64 {
        index as f64 / self.fps
    }
}

impl FrameSource for SimCamera {
    type Frame = SimFrame;
    type Error = Infallible;

    fn next_frame(&mut self) -> Result<Option<SimFrame>, Infallible> {
        let index = self.next_index;
        if index > self.last_index {
            return Ok(None);
        }
        let t = self.time_of(index);
        if index > 0 {
            let prev = self.time_of(index - 1);
            for target in &mut self.targets {
                target.step(prev, t - prev);
            }
        }
        self.next_index += 1;

        let truth = self
            .targets
            .iter()
            .filter(|target| target.is_active(t))
            .map(|target| TargetState {
                id: target.id,
                bbox: target.bbox(),
            })
            .collect();
        Ok(Some(SimFrame {
            index,
            timestamp: t,
            width: self.width,
            height: self.height,
            truth,
        }))
    }
}

/// Seeded noisy detector over [`SimFrame`] ground truth.
pub struct SimDetector {
    pub params: DetectorParams,
    rng: ChaCha8Rng,
}

impl SimDetector {
    pub fn new(params: DetectorParams, seed: u64) -> Self {
        Self {
            params,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Uniform sample in [-half, half].
    fn jitter(&mut self, half: f64) -> f64 {
        self.rng.gen::<f64>() * half * 2.0 - half
    }

    /// Draw N until the product of uniforms drops below e^{-lambda}.
    fn poisson(&mut self, lambda: f64) -> usize {
        if lambda <= 0.0 {
            return 0;
        }
        let threshold = (-lambda).exp();
        let mut n = 0;
        let mut prod = self.rng.gen::<f64>();
        while prod > threshold && n < MAX_CLUTTER {
            prod *= self.rng.gen::<f64>();
            n += 1;
        }
        n
    }
}

impl Detector<SimFrame> for SimDetector {
    type Error = Infallible;

    fn detect(&mut self, frame: &SimFrame) -> Result<Vec<Detection>, Infallible> {
        let p = self.params.clone();
        let (width, height) = (f64::from(frame.width), f64::from(frame.height));
        let mut detections = Vec::new();

        for target in &frame.truth {
            if self.rng.gen::<f64>() > p.p_detection {
                continue;
            }
            let b = &target.bbox;
            let cx = f64::from(b.x1 + b.x2) / 2.0 + self.jitter(p.position_noise_px);
            let cy = f64::from(b.y1 + b.y2) / 2.0 + self.jitter(p.position_noise_px);
            if !(0.0..width).contains(&cx) || !(0.0..height).contains(&cy) {
                continue;
            }
            let w = (f64::from(b.width()) + self.jitter(p.size_noise_px)).max(MIN_BOX_SIDE);
            let h = (f64::from(b.height()) + self.jitter(p.size_noise_px)).max(MIN_BOX_SIDE);
            let confidence =
                (p.confidence_mean + self.jitter(p.confidence_spread)).clamp(0.0, 1.0);
            detections.push(Detection::from_corners(
                cx - w / 2.0,
                cy - h / 2.0,
                cx + w / 2.0,
                cy + h / 2.0,
                confidence,
                0,
            ));
        }

        let n_clutter = self.poisson(p.clutter_rate);
        for _ in 0..n_clutter {
            let cx = self.rng.gen::<f64>() * width;
            let cy = self.rng.gen::<f64>() * height;
            let w = self.rng.gen_range(10.0..80.0);
            let h = self.rng.gen_range(10.0..80.0);
            let confidence = self.rng.gen::<f64>() * p.clutter_confidence_max;
            detections.push(Detection::from_corners(
                cx - w / 2.0,
                cy - h / 2.0,
                cx + w / 2.0,
                cy + h / 2.0,
                confidence,
                0,
            ));
        }

        // Detector output comes strongest first
        detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
        Ok(detections)
    }
}
