// src/tracker.rs
//
// Track & speed estimation state machine.
//
//   WAITING ──region──▶ TRACKING ──boundary exit──▶ event, WAITING
//      ▲                   │
//      └──motion lost──────┘ (track abandoned, no event)
//
// One detector result drives one step. While TRACKING, every frame
// yields an instantaneous speed from the leading-edge displacement
// since entry; plausible samples accumulate and the median of them
// becomes the reported speed once the vehicle reaches the rectangle
// boundary. The median shrugs off the contour-area jitter that is
// typical near entry and exit.
//
// A track that never resolves (vehicle stops, detector fault) trips
// the stuck-loop bound: the caller must resynchronize the background
// from the current frame, and the tracker returns to WAITING. No
// anomaly in here is an error; unresolved tracks are simply dropped.
// Better to under-report than to emit a speed from a truncated
// traversal.

use crate::calibration::Calibration;
use crate::config::Config;
use crate::types::{DetectionEvent, Direction, Region, StepOutcome, TrackState};
use tracing::{debug, info, warn};

pub struct SpeedTracker {
    calibration: Calibration,
    rect_width: usize,
    min_speed: f64,
    max_speed: f64,
    min_speed_samples: usize,
    edge_tolerance_px: usize,
    stuck_frame_limit: u32,
    unit_factor: f64,

    state: TrackState,
    direction: Direction,
    entry_x: usize,
    last_x: usize,
    entry_time: f64,
    speed_samples: Vec<f64>,
    stall_count: u32,
}

impl SpeedTracker {
    pub fn new(config: &Config) -> Self {
        Self {
            calibration: Calibration::new(&config.camera),
            rect_width: config.camera.monitored_width,
            min_speed: config.tracking.min_speed,
            max_speed: config.tracking.max_speed,
            min_speed_samples: config.tracking.min_speed_samples,
            edge_tolerance_px: config.tracking.edge_tolerance_px,
            stuck_frame_limit: config.tracking.stuck_frame_limit,
            unit_factor: config.tracking.unit_factor,
            state: TrackState::Waiting,
            direction: Direction::Unknown,
            entry_x: 0,
            last_x: 0,
            entry_time: 0.0,
            speed_samples: Vec::new(),
            stall_count: 0,
        }
    }

    pub fn state(&self) -> TrackState {
        self.state
    }

    /// Advance the state machine by one frame.
    /// `now` is the frame source's monotonic timestamp in seconds.
    pub fn update(&mut self, region: Option<Region>, now: f64) -> StepOutcome {
        match (self.state, region) {
            (TrackState::Waiting, None) => StepOutcome::Idle,

            (TrackState::Waiting, Some(region)) => {
                self.state = TrackState::Tracking;
                self.direction = Direction::Unknown;
                self.entry_x = region.x;
                self.last_x = region.x;
                self.entry_time = now;
                self.speed_samples.clear();
                self.stall_count = 0;
                info!("🚗 Tracking started at x={} ({:.2}s)", region.x, now);
                StepOutcome::Tracking
            }

            (TrackState::Tracking, None) => {
                // Occlusion, detector miss, or a truncated partial
                // view. Discard everything; no event.
                info!(
                    "Motion lost after {} frame(s), track abandoned",
                    self.stall_count
                );
                self.clear_track();
                StepOutcome::Abandoned
            }

            (TrackState::Tracking, Some(region)) => self.step_tracking(region, now),
        }
    }

    fn step_tracking(&mut self, region: Region, now: f64) -> StepOutcome {
        self.stall_count += 1;

        if self.stall_count > self.stuck_frame_limit {
            warn!(
                "⏰ Caught in tracking loop ({} frames); forcing background resync",
                self.stall_count
            );
            self.clear_track();
            return StepOutcome::Stuck;
        }

        // Direction is re-inferred from the raw x comparison until the
        // first plausible sample lands, then frozen: one noisy frame
        // reversing the sign must not flip the lane-distance lookup
        // mid-track.
        let frozen = self.direction != Direction::Unknown && !self.speed_samples.is_empty();
        if !frozen {
            self.direction = if region.x >= self.last_x {
                Direction::LeftToRight
            } else {
                Direction::RightToLeft
            };
        }

        // Leading-edge displacement since entry. Left-to-right traffic
        // leads with the right edge of the blob, right-to-left with
        // the left edge. Noise can drive this negative; the resulting
        // sample falls outside the plausibility band and is dropped.
        let displacement = match self.direction {
            Direction::RightToLeft => self.entry_x as f64 - region.x as f64,
            _ => region.right() as f64 - self.entry_x as f64,
        };

        let speed = self.instantaneous_speed(displacement, now - self.entry_time, self.direction);

        if speed >= self.min_speed && speed < self.max_speed {
            self.speed_samples.push(speed);
            debug!(
                "Sample {}: {:.1} ({} px, {:?})",
                self.speed_samples.len(),
                speed,
                displacement,
                self.direction
            );
        } else {
            debug!("Dropped implausible sample {:.1}", speed);
        }

        if self.speed_samples.len() >= self.min_speed_samples && self.edge_reached(&region) {
            let event = self.build_event(&region, now);
            info!(
                "✅ Vehicle resolved: {:.1} {} over {} sample(s)",
                event.speed,
                event.direction.as_str(),
                event.sample_count
            );
            self.clear_track();
            return StepOutcome::Event(event);
        }

        self.last_x = region.x;
        StepOutcome::Tracking
    }

    /// `displacement_px * ft_per_pixel / elapsed`, scaled into the
    /// reporting unit. A non-positive elapsed time (clock anomaly)
    /// yields zero rather than a division fault.
    fn instantaneous_speed(
        &self,
        displacement_px: f64,
        elapsed_secs: f64,
        direction: Direction,
    ) -> f64 {
        if elapsed_secs <= 0.0 {
            return 0.0;
        }
        displacement_px * self.calibration.ft_per_pixel(direction) / elapsed_secs
            * self.unit_factor
    }

    /// Has the leading edge come within tolerance of the rectangle
    /// boundary in the direction of travel?
    fn edge_reached(&self, region: &Region) -> bool {
        match self.direction {
            Direction::LeftToRight => {
                region.right() + self.edge_tolerance_px >= self.rect_width
            }
            Direction::RightToLeft => region.x <= self.edge_tolerance_px,
            Direction::Unknown => false,
        }
    }

    fn build_event(&self, region: &Region, now: f64) -> DetectionEvent {
        let exit_x = match self.direction {
            Direction::RightToLeft => region.x,
            _ => region.right(),
        };
        let mut event = DetectionEvent {
            direction: self.direction,
            speed: median(&self.speed_samples),
            sample_count: self.speed_samples.len(),
            frames_tracked: self.stall_count,
            timestamp: now,
            metadata: Default::default(),
        };
        event
            .metadata
            .insert("entry_x".into(), serde_json::json!(self.entry_x));
        event
            .metadata
            .insert("exit_x".into(), serde_json::json!(exit_x));
        event.metadata.insert(
            "elapsed_secs".into(),
            serde_json::json!(now - self.entry_time),
        );
        event
    }

    fn clear_track(&mut self) {
        self.state = TrackState::Waiting;
        self.direction = Direction::Unknown;
        self.entry_x = 0;
        self.last_x = 0;
        self.entry_time = 0.0;
        self.speed_samples.clear();
        self.stall_count = 0;
    }
}

/// Median with the middle pair averaged for even-length input.
fn median(samples: &[f64]) -> f64 {
    debug_assert!(!samples.is_empty());
    let mut sorted = samples.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}
