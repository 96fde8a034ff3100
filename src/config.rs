// src/config.rs

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub camera: CameraConfig,
    pub detection: DetectionConfig,
    pub tracking: TrackingConfig,
}

/// Fixed mounting geometry of the camera and the monitored rectangle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CameraConfig {
    /// Monitored rectangle width in pixels (frames arrive pre-cropped).
    pub monitored_width: usize,
    /// Monitored rectangle height in pixels.
    pub monitored_height: usize,
    /// Horizontal field of view in degrees.
    pub fov_degrees: f64,
    /// Perpendicular distance (feet) to the lane carrying
    /// left-to-right traffic.
    pub ltr_distance_ft: f64,
    /// Perpendicular distance (feet) to the lane carrying
    /// right-to-left traffic. The two differ because the camera
    /// sits on one side of the road.
    pub rtl_distance_ft: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionConfig {
    /// Intensity difference (8-bit scale) above which a pixel counts
    /// as foreground.
    pub pixel_threshold: u8,
    /// Minimum bounding-box area (px²) for a blob to qualify as a
    /// vehicle. Resolution-dependent; retune when the rectangle or
    /// camera distance changes.
    pub min_blob_area: usize,
    /// 3x3 binary dilation passes applied to the thresholded mask to
    /// merge fragmented blobs before component extraction.
    pub dilate_iterations: usize,
    /// EWMA blend factor for the background reference frame.
    pub background_alpha: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackingConfig {
    /// Samples below this speed are dropped (parked cars, walkers).
    pub min_speed: f64,
    /// Samples at or above this speed are dropped (noise spikes).
    pub max_speed: f64,
    /// Plausible samples required before a traversal may resolve.
    pub min_speed_samples: usize,
    /// How close (px) the leading edge must get to the rectangle
    /// boundary to count as an exit.
    pub edge_tolerance_px: usize,
    /// Tracking frames without resolution before the stuck-loop
    /// recovery fires.
    pub stuck_frame_limit: u32,
    /// Reporting-unit conversion applied to ft/s. 0.681818 yields mph.
    pub unit_factor: f64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                monitored_width: 171,
                monitored_height: 32,
                fov_degrees: 53.5,
                ltr_distance_ft: 50.0,
                rtl_distance_ft: 85.0,
            },
            detection: DetectionConfig {
                pixel_threshold: 15,
                min_blob_area: 175,
                dilate_iterations: 2,
                background_alpha: 0.25,
            },
            tracking: TrackingConfig {
                min_speed: 20.0,
                max_speed: 70.0,
                min_speed_samples: 3,
                edge_tolerance_px: 2,
                stuck_frame_limit: 50,
                unit_factor: 0.681818,
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let contents =
            fs::read_to_string(path).with_context(|| format!("reading config {path}"))?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Structural checks, run once before any frame is processed.
    /// Everything past this point is data-quality rejection, never
    /// an error.
    pub fn validate(&self) -> Result<()> {
        if self.camera.monitored_width == 0 || self.camera.monitored_height == 0 {
            bail!(
                "monitored rectangle must be non-empty, got {}x{}",
                self.camera.monitored_width,
                self.camera.monitored_height
            );
        }
        if !(self.camera.fov_degrees > 0.0 && self.camera.fov_degrees < 180.0) {
            bail!("fov_degrees must be in (0, 180), got {}", self.camera.fov_degrees);
        }
        if self.camera.ltr_distance_ft <= 0.0 || self.camera.rtl_distance_ft <= 0.0 {
            bail!("lane calibration distances must be positive");
        }
        if !(self.detection.background_alpha > 0.0 && self.detection.background_alpha <= 1.0) {
            bail!(
                "background_alpha must be in (0, 1], got {}",
                self.detection.background_alpha
            );
        }
        if self.tracking.min_speed >= self.tracking.max_speed {
            bail!(
                "speed band is empty: [{}, {})",
                self.tracking.min_speed,
                self.tracking.max_speed
            );
        }
        if self.tracking.min_speed_samples == 0 {
            bail!("min_speed_samples must be at least 1");
        }
        if self.tracking.stuck_frame_limit == 0 {
            bail!("stuck_frame_limit must be at least 1");
        }
        if self.tracking.unit_factor <= 0.0 {
            bail!("unit_factor must be positive, got {}", self.tracking.unit_factor);
        }
        Ok(())
    }
}
