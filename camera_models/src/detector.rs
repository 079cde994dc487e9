//! Object detector interface and detector noise parameters.

use crate::frame::Frame;
use serde::{Deserialize, Serialize};
use tracker_core::Detection;

/// Turns a frame into candidate boxes.
pub trait Detector<F: Frame> {
    type Error: std::error::Error + Send + Sync + 'static;

    fn detect(&mut self, frame: &F) -> Result<Vec<Detection>, Self::Error>;
}

/// Statistical behaviour of a box detector, as seen by the tracker.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorParams {
    /// Probability a visible target yields a box in a given frame
    pub p_detection: f64,
    /// Half-width of the uniform jitter on the box center (px)
    pub position_noise_px: f64,
    /// Half-width of the uniform jitter on box width and height (px)
    pub size_noise_px: f64,
    /// Mean confidence reported for true targets, in [0, 1]
    pub confidence_mean: f64,
    /// Half-width of the uniform spread around `confidence_mean`
    pub confidence_spread: f64,
    /// Mean number of false alarms per frame (Poisson)
    pub clutter_rate: f64,
    /// False alarm confidence is uniform in [0, clutter_confidence_max]
    pub clutter_confidence_max: f64,
}

impl Default for DetectorParams {
    fn default() -> Self {
        Self {
            p_detection: 0.95,
            position_noise_px: 3.0,
            size_noise_px: 2.0,
            confidence_mean: 0.8,
            confidence_spread: 0.15,
            clutter_rate: 0.2,
            clutter_confidence_max: 0.6,
        }
    }
}

impl DetectorParams {
    /// A detector that sees everything exactly, with no false alarms.
    pub fn perfect() -> Self {
        Self {
            p_detection: 1.0,
            position_noise_px: 0.0,
            size_noise_px: 0.0,
            confidence_mean: 0.9,
            confidence_spread: 0.0,
            clutter_rate: 0.0,
            clutter_confidence_max: 0.0,
        }
    }
}
