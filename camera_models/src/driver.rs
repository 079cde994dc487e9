//! Live loop: pull a frame, detect, run the pipeline, report.
//!
//! The driver owns the injected collaborators; the pipeline is borrowed per
//! call so callers keep access to it between frames.

use crate::{
    detector::Detector,
    frame::{Frame, FrameSource},
};
use thiserror::Error;
use tracing::{debug, info};
use tracker_core::{FrameDetections, Pipeline, PipelineOutput};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum DriverError {
    #[error("frame source failed after {after} frames: {source}")]
    Source {
        after: u64,
        #[source]
        source: BoxError,
    },
    #[error("detector failed on frame {frame}: {source}")]
    Detector {
        frame: u64,
        #[source]
        source: BoxError,
    },
}

/// Result of one driver step.
pub struct Step<F> {
    pub frame: F,
    pub detections: FrameDetections,
    pub output: PipelineOutput,
}

/// Feeds frames from a [`FrameSource`] through a [`Detector`] into a [`Pipeline`].
pub struct FrameDriver<S, D> {
    source: S,
    detector: D,
    frames: u64,
    last_timestamp: Option<f64>,
    fps: f64,
}

impl<S, D> FrameDriver<S, D>
where
    S: FrameSource,
    D: Detector<S::Frame>,
{
    pub fn new(source: S, detector: D) -> Self {
        Self {
            source,
            detector,
            frames: 0,
            last_timestamp: None,
            fps: 0.0,
        }
    }

    /// Frames processed so far.
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Instantaneous frame rate from the last two frame timestamps.
    pub fn fps(&self) -> f64 {
        self.fps
    }

    /// Process one frame. `Ok(None)` once the source is exhausted.
    pub fn step(&mut self, pipeline: &mut Pipeline) -> Result<Option<Step<S::Frame>>, DriverError> {
        let next = self.source.next_frame().map_err(|e| DriverError::Source {
            after: self.frames,
            source: Box::new(e),
        })?;
        let Some(frame) = next else {
            return Ok(None);
        };

        let detections = self
            .detector
            .detect(&frame)
            .map_err(|e| DriverError::Detector {
                frame: frame.index(),
                source: Box::new(e),
            })?;

        let timestamp = frame.timestamp();
        if let Some(prev) = self.last_timestamp {
            let dt = timestamp - prev;
            if dt > 0.0 {
                self.fps = 1.0 / dt;
            }
        }
        self.last_timestamp = Some(timestamp);

        let detections = FrameDetections {
            frame_index: frame.index(),
            timestamp,
            detections,
        };
        let output = pipeline.process_frame(&detections);
        self.frames += 1;

        debug!(
            frame = frame.index(),
            detections = detections.detections.len(),
            active = output.snapshot.active_count,
            fps = self.fps,
            "frame processed"
        );
        Ok(Some(Step {
            frame,
            detections,
            output,
        }))
    }

    /// Run until the source is exhausted or `max_frames` frames have been
    /// processed. Returns the number of frames processed by this call.
    pub fn run<F>(
        &mut self,
        pipeline: &mut Pipeline,
        max_frames: Option<u64>,
        mut on_frame: F,
    ) -> Result<u64, DriverError>
    where
        F: FnMut(&S::Frame, &FrameDetections, &PipelineOutput),
    {
        let mut processed = 0;
        while max_frames.map_or(true, |max| processed < max) {
            let Some(step) = self.step(pipeline)? else {
                break;
            };
            on_frame(&step.frame, &step.detections, &step.output);
            processed += 1;
        }
        info!(frames = processed, "frame loop finished");
        Ok(processed)
    }
}
