// src/types.rs

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Grayscale frame, pre-cropped to the monitored rectangle.
/// Row-major storage: pixel at (x, y) = data[y * width + x]
#[derive(Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: usize,
    pub height: usize,
}

impl Frame {
    pub fn new(data: Vec<u8>, width: usize, height: usize) -> Self {
        debug_assert_eq!(data.len(), width * height);
        Self {
            data,
            width,
            height,
        }
    }

    /// Convert from RGB packed bytes (3 bytes per pixel)
    pub fn from_rgb(rgb: &[u8], width: usize, height: usize) -> Self {
        let mut gray = Vec::with_capacity(width * height);
        for pixel in rgb.chunks_exact(3) {
            // ITU-R BT.601 luma
            let g =
                (0.299 * pixel[0] as f32 + 0.587 * pixel[1] as f32 + 0.114 * pixel[2] as f32) as u8;
            gray.push(g);
        }
        Self::new(gray, width, height)
    }

    #[inline]
    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.data[y * self.width + x]
    }
}

/// Bounding box of the largest moving blob for one frame,
/// in rectangle-local pixel coordinates. Recomputed every frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Region {
    pub fn area(&self) -> usize {
        self.width * self.height
    }

    /// One past the rightmost column covered by the region.
    pub fn right(&self) -> usize {
        self.x + self.width
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Unknown,
    LeftToRight,
    RightToLeft,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Unknown => "unknown",
            Direction::LeftToRight => "left_to_right",
            Direction::RightToLeft => "right_to_left",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackState {
    Waiting,
    Tracking,
}

/// What one tracker step did with the frame's detection result.
/// The pipeline applies the side effects (stats, background reset)
/// so the tracker never reaches back into the background model.
#[derive(Debug, Clone)]
pub enum StepOutcome {
    /// WAITING and nothing moved.
    Idle,
    /// A vehicle is inside the rectangle and being followed.
    Tracking,
    /// A vehicle crossed the far boundary; traversal complete.
    Event(DetectionEvent),
    /// Motion vanished mid-track. No event, samples discarded.
    Abandoned,
    /// TRACKING exceeded the stuck-loop bound. The background must
    /// be resynchronized from the current frame.
    Stuck,
}

/// The sole output artifact: one per completed traversal.
#[derive(Debug, Clone, Serialize)]
pub struct DetectionEvent {
    pub direction: Direction,
    /// Final speed in the reporting unit (mph with the default
    /// unit factor), median of the per-frame samples.
    pub speed: f64,
    /// Number of plausible speed samples behind the median.
    pub sample_count: usize,
    /// Tracking frames spent on this vehicle. Doubles as a quality
    /// rating: low counts mean a fast, clean traversal.
    pub frames_tracked: u32,
    /// Monotonic timestamp (seconds) at resolution, as supplied
    /// by the frame source.
    pub timestamp: f64,
    pub metadata: HashMap<String, serde_json::Value>,
}
