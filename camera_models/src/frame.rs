//! Frame acquisition interface.

/// One acquired camera frame. The pixel payload is the detector's business.
pub trait Frame {
    /// Sequence number assigned by the source
    fn index(&self) -> u64;
    /// Capture time in seconds (monotonic)
    fn timestamp(&self) -> f64;
}

/// Anything that yields frames: a live camera, a video file, a simulator.
pub trait FrameSource {
    type Frame: Frame;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Next frame, or `Ok(None)` once the source is exhausted.
    fn next_frame(&mut self) -> Result<Option<Self::Frame>, Self::Error>;
}

/// Frame with no payload, for sources that only carry timing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimedFrame {
    pub index: u64,
    pub timestamp: f64,
}

impl Frame for TimedFrame {
    fn index(&self) -> u64 {
        self.index
    }

    fn timestamp(&self) -> f64 {
        self.timestamp
    }
}
