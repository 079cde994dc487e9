//! `camera_models` — Frame source and detector interfaces, detector noise
//! parameters, and the frame driver that feeds the tracking pipeline.

pub mod detector;
pub mod driver;
pub mod frame;

pub use detector::{Detector, DetectorParams};
pub use driver::{DriverError, FrameDriver, Step};
pub use frame::{Frame, FrameSource, TimedFrame};
