// src/pipeline.rs
//
// Per-camera orchestration. One instance owns the background model,
// the detector, and the tracker; the caller pushes one pre-cropped
// grayscale frame at a time and receives at most one detection event
// back, synchronously, before it captures the next frame.
//
// Signal flow:
//   Frame → BackgroundModel.difference → MotionDetector → SpeedTracker
//         → Option<DetectionEvent> (handed to the persistence layer
//           by the caller)
//
// Single-threaded by design. Multi-camera deployments run one
// pipeline per camera with nothing shared.

use crate::background::BackgroundModel;
use crate::config::Config;
use crate::detector::MotionDetector;
use crate::tracker::SpeedTracker;
use crate::types::{DetectionEvent, Frame, StepOutcome, TrackState};
use anyhow::{bail, Result};
use tracing::{debug, info};

/// Running counters for the session report.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct PipelineStats {
    pub frames_processed: u64,
    pub tracks_started: u64,
    pub events_emitted: u64,
    pub tracks_abandoned: u64,
    pub stuck_resets: u64,
}

pub struct SpeedPipeline {
    config: Config,
    background: Option<BackgroundModel>,
    detector: MotionDetector,
    tracker: SpeedTracker,
    stats: PipelineStats,
}

impl SpeedPipeline {
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let detector = MotionDetector::new(&config.detection);
        let tracker = SpeedTracker::new(&config);
        info!(
            "Speed pipeline ready: {}x{} rectangle, threshold {}, speed band [{}, {})",
            config.camera.monitored_width,
            config.camera.monitored_height,
            config.detection.pixel_threshold,
            config.tracking.min_speed,
            config.tracking.max_speed
        );
        Ok(Self {
            config,
            background: None,
            detector,
            tracker,
            stats: PipelineStats::default(),
        })
    }

    /// Process one captured frame. `now` is the frame source's
    /// monotonic timestamp in seconds.
    pub fn process_frame(&mut self, frame: &Frame, now: f64) -> Result<Option<DetectionEvent>> {
        if frame.width != self.config.camera.monitored_width
            || frame.height != self.config.camera.monitored_height
        {
            bail!(
                "frame is {}x{}, monitored rectangle is {}x{}",
                frame.width,
                frame.height,
                self.config.camera.monitored_width,
                self.config.camera.monitored_height
            );
        }

        self.stats.frames_processed += 1;

        // First frame seeds the scene estimate; nothing to detect yet.
        if self.background.is_none() {
            self.background = Some(BackgroundModel::from_frame(frame));
            return Ok(None);
        }
        let background = self.background.as_mut().unwrap();

        let region = self.detector.detect(frame, background);

        let was_waiting = self.tracker.state() == TrackState::Waiting;
        let outcome = self.tracker.update(region, now);
        if was_waiting && self.tracker.state() == TrackState::Tracking {
            self.stats.tracks_started += 1;
        }

        let mut emitted = None;
        match outcome {
            StepOutcome::Idle => {
                // Quiet road: keep tracking lighting drift.
                background.accumulate(frame, self.config.detection.background_alpha);
            }
            StepOutcome::Tracking => {}
            StepOutcome::Abandoned => {
                self.stats.tracks_abandoned += 1;
                // The vehicle is gone from this frame, so it is safe
                // to resume adapting.
                background.accumulate(frame, self.config.detection.background_alpha);
            }
            StepOutcome::Stuck => {
                self.stats.stuck_resets += 1;
                debug!("Resynchronizing background after stuck track");
                background.reset(frame);
            }
            StepOutcome::Event(event) => {
                self.stats.events_emitted += 1;
                emitted = Some(event);
            }
        }

        Ok(emitted)
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    pub fn state(&self) -> TrackState {
        self.tracker.state()
    }

    pub fn background(&self) -> Option<&BackgroundModel> {
        self.background.as_ref()
    }
}
