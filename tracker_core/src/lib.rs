//! `tracker_core` — Three-slot target tracking on 2-D detection boxes.
//!
//! # Module layout
//! - [`types`]           — Fundamental types (IDs, roles, boxes, detections)
//! - [`track`]           — Track struct: smoothing, lock, validity, quality
//! - [`association`]     — Detection-to-track match scoring
//! - [`slot_controller`] — HEAD / PRIMARY / SECONDARY slot policy
//! - [`snapshot`]        — Read-only slot view for rendering and telemetry
//! - [`pipeline`]        — Per-frame orchestrator
//! - [`config`]          — JSON config loading and validation
//! - [`metrics`]         — RMSE, ID-switch, precision/recall

pub mod association;
pub mod config;
pub mod metrics;
pub mod pipeline;
pub mod slot_controller;
pub mod snapshot;
pub mod track;
pub mod types;

pub use association::{AssociationConfig, RoleScores};
pub use config::{load_config, parse_config, ConfigError};
pub use pipeline::{Pipeline, PipelineConfig, PipelineDebugData, PipelineOutput};
pub use slot_controller::{FrameEvents, Outcome, SlotController, SlotControllerConfig};
pub use snapshot::{SlotSnapshot, TrackSnapshot};
pub use track::{Track, TrackConfig};
pub use types::{BBox, Detection, FrameDetections, Point, Role, TrackId};
