// src/detector.rs
//
// Frame differencing motion detector.
//
// difference → binary threshold → dilate → connected components →
// largest qualifying bounding box. At most one region comes out per
// frame: two vehicles inside the rectangle at once are out of scope,
// the bigger blob wins.
//
// Zero dependency on an imaging library. The mask work is a handful
// of passes over a byte buffer at monitored-rectangle resolution
// (a few thousand pixels), so plain loops are plenty fast.

use crate::background::BackgroundModel;
use crate::config::DetectionConfig;
use crate::types::{Frame, Region};
use tracing::debug;

pub struct MotionDetector {
    pixel_threshold: u8,
    min_blob_area: usize,
    dilate_iterations: usize,
}

impl MotionDetector {
    pub fn new(config: &DetectionConfig) -> Self {
        Self {
            pixel_threshold: config.pixel_threshold,
            min_blob_area: config.min_blob_area,
            dilate_iterations: config.dilate_iterations,
        }
    }

    /// Find the largest moving blob in `frame`, if any qualifies.
    pub fn detect(&self, frame: &Frame, background: &BackgroundModel) -> Option<Region> {
        let delta = background.difference(frame);

        let mut mask: Vec<u8> = delta
            .iter()
            .map(|&d| u8::from(d > self.pixel_threshold))
            .collect();

        for _ in 0..self.dilate_iterations {
            mask = dilate3x3(&mask, frame.width, frame.height);
        }

        let regions = connected_regions(&mask, frame.width, frame.height);

        let best = regions
            .into_iter()
            .filter(|r| r.area() > self.min_blob_area)
            .max_by_key(Region::area);

        if let Some(region) = best {
            debug!(
                "Motion blob at x={} w={} area={}",
                region.x,
                region.width,
                region.area()
            );
        }
        best
    }
}

/// One pass of 3x3 binary dilation. Fills single-pixel holes and
/// merges fragments of the same vehicle that thresholding split up.
fn dilate3x3(mask: &[u8], width: usize, height: usize) -> Vec<u8> {
    let mut out = vec![0u8; mask.len()];
    for y in 0..height {
        let y0 = y.saturating_sub(1);
        let y1 = (y + 1).min(height - 1);
        for x in 0..width {
            let x0 = x.saturating_sub(1);
            let x1 = (x + 1).min(width - 1);
            'probe: for ny in y0..=y1 {
                for nx in x0..=x1 {
                    if mask[ny * width + nx] != 0 {
                        out[y * width + x] = 1;
                        break 'probe;
                    }
                }
            }
        }
    }
    out
}

/// Bounding boxes of all 8-connected foreground components.
fn connected_regions(mask: &[u8], width: usize, height: usize) -> Vec<Region> {
    let mut visited = vec![false; mask.len()];
    let mut regions = Vec::new();
    let mut stack = Vec::new();

    for start in 0..mask.len() {
        if mask[start] == 0 || visited[start] {
            continue;
        }

        let mut min_x = usize::MAX;
        let mut max_x = 0usize;
        let mut min_y = usize::MAX;
        let mut max_y = 0usize;

        visited[start] = true;
        stack.push(start);

        while let Some(idx) = stack.pop() {
            let x = idx % width;
            let y = idx / width;
            min_x = min_x.min(x);
            max_x = max_x.max(x);
            min_y = min_y.min(y);
            max_y = max_y.max(y);

            let y0 = y.saturating_sub(1);
            let y1 = (y + 1).min(height - 1);
            let x0 = x.saturating_sub(1);
            let x1 = (x + 1).min(width - 1);
            for ny in y0..=y1 {
                for nx in x0..=x1 {
                    let nidx = ny * width + nx;
                    if mask[nidx] != 0 && !visited[nidx] {
                        visited[nidx] = true;
                        stack.push(nidx);
                    }
                }
            }
        }

        regions.push(Region {
            x: min_x,
            y: min_y,
            width: max_x - min_x + 1,
            height: max_y - min_y + 1,
        });
    }

    regions
}

#[cfg(test)]
mod tests {
    use super::*;

    const W: usize = 64;
    const H: usize = 24;

    fn empty_scene() -> Frame {
        Frame::new(vec![40u8; W * H], W, H)
    }

    /// Scene with a bright rectangle painted over the flat background.
    fn scene_with_box(x: usize, y: usize, w: usize, h: usize) -> Frame {
        let mut frame = empty_scene();
        for yy in y..(y + h).min(H) {
            for xx in x..(x + w).min(W) {
                frame.data[yy * W + xx] = 220;
            }
        }
        frame
    }

    fn detector(min_area: usize) -> MotionDetector {
        MotionDetector::new(&DetectionConfig {
            pixel_threshold: 15,
            min_blob_area: min_area,
            dilate_iterations: 2,
            background_alpha: 0.25,
        })
    }

    #[test]
    fn no_motion_in_static_scene() {
        let bg = BackgroundModel::from_frame(&empty_scene());
        assert!(detector(20).detect(&empty_scene(), &bg).is_none());
    }

    #[test]
    fn finds_moving_box() {
        let bg = BackgroundModel::from_frame(&empty_scene());
        let region = detector(20)
            .detect(&scene_with_box(10, 8, 12, 8), &bg)
            .expect("blob should qualify");

        // Two dilation passes grow the box by two pixels per side.
        assert_eq!(region.x, 8);
        assert_eq!(region.y, 6);
        assert_eq!(region.width, 16);
        assert_eq!(region.height, 12);
    }

    #[test]
    fn small_blob_is_noise() {
        let bg = BackgroundModel::from_frame(&empty_scene());
        // 2x2 blob dilates to 6x6 = 36 px, still under the bar.
        assert!(detector(100)
            .detect(&scene_with_box(20, 10, 2, 2), &bg)
            .is_none());
    }

    #[test]
    fn largest_blob_wins() {
        let bg = BackgroundModel::from_frame(&empty_scene());
        let mut frame = scene_with_box(4, 4, 6, 6);
        for yy in 10..20 {
            for xx in 40..58 {
                frame.data[yy * W + xx] = 220;
            }
        }

        let region = detector(20).detect(&frame, &bg).unwrap();
        assert!(region.x >= 38, "picked the small blob: {region:?}");
    }

    #[test]
    fn dilation_merges_fragments() {
        let bg = BackgroundModel::from_frame(&empty_scene());
        // Two halves of one vehicle, split by a 2px gap the dilation
        // closes.
        let mut frame = scene_with_box(10, 8, 8, 8);
        for yy in 8..16 {
            for xx in 20..28 {
                frame.data[yy * W + xx] = 220;
            }
        }

        let region = detector(20).detect(&frame, &bg).unwrap();
        assert!(
            region.width >= 18,
            "fragments were not merged: {region:?}"
        );
    }

    #[test]
    fn threshold_ignores_subtle_lighting_change() {
        let bg = BackgroundModel::from_frame(&empty_scene());
        // Whole scene brightens by less than the threshold.
        let frame = Frame::new(vec![50u8; W * H], W, H);
        assert!(detector(20).detect(&frame, &bg).is_none());
    }
}
