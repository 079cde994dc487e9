//! Loading and validation of [`PipelineConfig`] files.
//!
//! Config files are JSON; every field is optional and falls back to the
//! defaults, so `{"slots": {"min_separation": 40.0}}` is a complete file.

use crate::pipeline::PipelineConfig;
use std::{fs::File, io::BufReader, path::Path};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed config file: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("`{field}` must be a finite, non-negative number (got {value})")]
    NotNonNegative { field: &'static str, value: f64 },
    #[error("`{field}` must lie in [0, 1] (got {value})")]
    NotAFraction { field: &'static str, value: f64 },
    #[error("`history_capacity` must be at least 2 (got {0})")]
    HistoryTooShort(usize),
}

fn non_negative(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NotNonNegative { field, value })
    }
}

fn fraction(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(ConfigError::NotAFraction { field, value })
    }
}

impl PipelineConfig {
    /// Reject settings the tracker cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let slots = &self.slots;
        let track = &slots.track;
        let assoc = &slots.association;

        non_negative("lock_duration", track.lock_duration)?;
        non_negative("min_confidence", track.min_confidence)?;
        non_negative("stale_timeout", track.stale_timeout)?;
        non_negative("prediction_horizon", track.prediction_horizon)?;
        non_negative("prediction_gain", track.prediction_gain)?;
        fraction("smoothing_alpha", track.smoothing_alpha)?;
        fraction("confidence_blend", track.confidence_blend)?;
        fraction("confidence_decay", track.confidence_decay)?;
        if track.history_capacity < 2 {
            return Err(ConfigError::HistoryTooShort(track.history_capacity));
        }

        non_negative("distance_threshold", assoc.distance_threshold)?;
        non_negative("match_accept_score", assoc.match_accept_score)?;
        non_negative("best_role_accept_score", assoc.best_role_accept_score)?;

        non_negative("min_separation", slots.min_separation)?;
        non_negative("creation_confidence_floor", slots.creation_confidence_floor)?;
        non_negative("arbitration_period", slots.arbitration_period)?;
        non_negative("role_change_debounce", slots.role_change_debounce)?;
        non_negative("quality_margin", slots.quality_margin)?;
        Ok(())
    }
}

/// Parse and validate a JSON config file.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    let reader = BufReader::new(File::open(path)?);
    let config: PipelineConfig = serde_json::from_reader(reader)?;
    config.validate()?;
    Ok(config)
}

/// Parse and validate a JSON config string.
pub fn parse_config(json: &str) -> Result<PipelineConfig, ConfigError> {
    let config: PipelineConfig = serde_json::from_str(json)?;
    config.validate()?;
    Ok(config)
}
