// src/calibration.rs
//
// Pinhole-camera ground-scale calibration.
//
// The frame spans `2 * tan(fov/2) * distance` feet at a given
// perpendicular distance from the camera, so each pixel column covers
// that width divided by the image width. Traffic in the near and far
// lanes sits at different distances, which is why the scale is looked
// up per direction of travel.

use crate::config::CameraConfig;
use crate::types::Direction;

#[derive(Debug, Clone, Copy)]
pub struct Calibration {
    ltr_ft_per_pixel: f64,
    rtl_ft_per_pixel: f64,
}

impl Calibration {
    pub fn new(camera: &CameraConfig) -> Self {
        Self {
            ltr_ft_per_pixel: feet_per_pixel(
                camera.fov_degrees,
                camera.ltr_distance_ft,
                camera.monitored_width,
            ),
            rtl_ft_per_pixel: feet_per_pixel(
                camera.fov_degrees,
                camera.rtl_distance_ft,
                camera.monitored_width,
            ),
        }
    }

    /// Ground scale for the lane carrying traffic in `direction`.
    /// Unknown falls back to the near lane; it only occurs before the
    /// first displacement comparison, which never reads the scale.
    pub fn ft_per_pixel(&self, direction: Direction) -> f64 {
        match direction {
            Direction::RightToLeft => self.rtl_ft_per_pixel,
            _ => self.ltr_ft_per_pixel,
        }
    }
}

/// Width of one pixel column in feet at the given distance.
pub fn feet_per_pixel(fov_degrees: f64, distance_ft: f64, image_width_px: usize) -> f64 {
    let frame_width_ft = 2.0 * (fov_degrees * 0.5).to_radians().tan() * distance_ft;
    frame_width_ft / image_width_px as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn matches_hand_computed_scale() {
        // 53.5 degree FOV, 50 ft, 640 px wide:
        // 2 * tan(26.75 deg) * 50 = 50.424 ft across the frame
        let ftpp = feet_per_pixel(53.5, 50.0, 640);
        assert!((ftpp - 50.424 / 640.0).abs() < 1e-3, "got {ftpp}");
    }

    #[test]
    fn scale_is_linear_in_distance() {
        let near = feet_per_pixel(53.5, 50.0, 640);
        let far = feet_per_pixel(53.5, 100.0, 640);
        assert!((far / near - 2.0).abs() < 1e-9);
    }

    #[test]
    fn far_lane_has_coarser_scale() {
        let calib = Calibration::new(&Config::default().camera);
        // The right-to-left lane is farther away, so each pixel spans
        // more ground.
        assert!(
            calib.ft_per_pixel(Direction::RightToLeft)
                > calib.ft_per_pixel(Direction::LeftToRight)
        );
    }
}
