// src/background.rs
//
// Slowly-adapting background reference frame.
//
// The model is a floating-point accumulator blended toward each new
// frame with a small alpha, so gradual lighting changes are absorbed
// while anything fast (a vehicle) stands out in the difference image.
// The pipeline only feeds it while no track is active; a vehicle being
// followed must never bleed into the reference.

use crate::types::Frame;
use tracing::debug;

pub struct BackgroundModel {
    accum: Vec<f32>,
    width: usize,
    height: usize,
}

impl BackgroundModel {
    /// Initialize the model from a frame, discarding any history.
    pub fn from_frame(frame: &Frame) -> Self {
        debug!(
            "Background initialized from {}x{} frame",
            frame.width, frame.height
        );
        Self {
            accum: frame.data.iter().map(|&p| p as f32).collect(),
            width: frame.width,
            height: frame.height,
        }
    }

    /// Reinitialize in place. Used when a stuck track has corrupted
    /// the scene estimate.
    pub fn reset(&mut self, frame: &Frame) {
        debug_assert_eq!(frame.data.len(), self.accum.len());
        for (acc, &pixel) in self.accum.iter_mut().zip(&frame.data) {
            *acc = pixel as f32;
        }
    }

    /// Exponential blend toward the given frame:
    /// `acc = alpha * frame + (1 - alpha) * acc`
    pub fn accumulate(&mut self, frame: &Frame, alpha: f32) {
        debug_assert_eq!(frame.data.len(), self.accum.len());
        let keep = 1.0 - alpha;
        for (acc, &pixel) in self.accum.iter_mut().zip(&frame.data) {
            *acc = alpha * pixel as f32 + keep * *acc;
        }
    }

    /// Absolute pixel-wise difference between the frame and the
    /// current scene estimate, rounded back to the 8-bit scale.
    pub fn difference(&self, frame: &Frame) -> Vec<u8> {
        debug_assert_eq!(frame.data.len(), self.accum.len());
        frame
            .data
            .iter()
            .zip(&self.accum)
            .map(|(&pixel, &acc)| {
                let reference = acc.round().clamp(0.0, 255.0) as i16;
                (pixel as i16 - reference).unsigned_abs() as u8
            })
            .collect()
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.accum
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_frame(value: u8, width: usize, height: usize) -> Frame {
        Frame::new(vec![value; width * height], width, height)
    }

    #[test]
    fn difference_against_initial_frame_is_zero() {
        let frame = flat_frame(80, 16, 8);
        let bg = BackgroundModel::from_frame(&frame);
        assert!(bg.difference(&frame).iter().all(|&d| d == 0));
    }

    #[test]
    fn accumulate_converges_to_new_scene() {
        let mut bg = BackgroundModel::from_frame(&flat_frame(50, 16, 8));
        let brighter = flat_frame(150, 16, 8);

        for _ in 0..60 {
            bg.accumulate(&brighter, 0.25);
        }

        // After enough blending the reference matches the new scene.
        let delta = bg.difference(&brighter);
        assert!(delta.iter().all(|&d| d <= 1), "max delta {:?}", delta.iter().max());
    }

    #[test]
    fn small_alpha_adapts_slowly() {
        let mut bg = BackgroundModel::from_frame(&flat_frame(50, 16, 8));
        bg.accumulate(&flat_frame(150, 16, 8), 0.01);

        // One step at alpha 0.01 moves the estimate by one unit.
        let expected = 0.01 * 150.0 + 0.99 * 50.0;
        assert!((bg.as_slice()[0] - expected).abs() < 1e-4);
    }

    #[test]
    fn reset_discards_history() {
        let mut bg = BackgroundModel::from_frame(&flat_frame(50, 16, 8));
        bg.accumulate(&flat_frame(200, 16, 8), 0.25);

        let snapshot = flat_frame(90, 16, 8);
        bg.reset(&snapshot);
        assert!(bg.difference(&snapshot).iter().all(|&d| d == 0));
    }

    #[test]
    fn difference_is_symmetric_around_reference() {
        let bg = BackgroundModel::from_frame(&flat_frame(100, 4, 4));
        let darker = flat_frame(70, 4, 4);
        let lighter = flat_frame(130, 4, 4);
        assert_eq!(bg.difference(&darker), bg.difference(&lighter));
    }
}
