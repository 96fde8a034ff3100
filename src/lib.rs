// src/lib.rs
//
// Single-vehicle speed estimation over a fixed monitored rectangle.
//
// Signal flow:
//   Frame (grayscale, pre-cropped) → BackgroundModel → MotionDetector
//       → SpeedTracker → DetectionEvent
//
// The crate is the algorithmic core only. Camera capture, on-screen
// rendering, rectangle selection and event persistence live with the
// caller, which pushes frames through a SpeedPipeline one at a time
// and consumes the events that come back.

pub mod background;
pub mod calibration;
pub mod config;
pub mod detector;
pub mod pipeline;
pub mod tracker;
pub mod types;

// Re-exports for ergonomic access from the embedding application
pub use background::BackgroundModel;
pub use calibration::{feet_per_pixel, Calibration};
pub use config::{CameraConfig, Config, DetectionConfig, TrackingConfig};
pub use detector::MotionDetector;
pub use pipeline::{PipelineStats, SpeedPipeline};
pub use tracker::SpeedTracker;
pub use types::{DetectionEvent, Direction, Frame, Region, StepOutcome, TrackState};
