use image::GrayImage;
use image::imageops::{self, FilterType};
use scorex_model::Feature;

use crate::error::{CoreError, Result};

/// Bresenham circle of radius 3 used by the segment test, in clockwise order.
const CIRCLE: [(i32, i32); 16] = [
    (0, -3),
    (1, -3),
    (2, -2),
    (3, -1),
    (3, 0),
    (3, 1),
    (2, 2),
    (1, 3),
    (0, 3),
    (-1, 3),
    (-2, 2),
    (-3, 1),
    (-3, 0),
    (-3, -1),
    (-2, -2),
    (-1, -3),
];

/// Minimum contiguous arc length for a positive segment test.
const ARC_LEN: u32 = 9;

/// Segment test needs a 3-pixel border on every side.
const MIN_REGION_DIM: u32 = 7;

/// Ratio between consecutive pyramid levels.
const SCALE_FACTOR: f32 = 1.2;

/// Hard cap on pyramid depth.
const MAX_LEVELS: usize = 8;

/// Levels smaller than this in either dimension are not generated.
const MIN_LEVEL_DIM: u32 = 32;

/// Feature footprint at the base scale; grows with the level scale so
/// coarse-level detections report proportionally larger sizes.
const BASE_PATCH: f32 = 7.0;

/// Seam between the scan engine and whatever finds features in a window.
///
/// Implementations must be deterministic for a given input so repeated scans
/// of the same material emit the same parameter stream.
pub trait KeypointDetector: Send + Sync {
    /// Detect features in `region`. Coordinates in the returned features are
    /// relative to the region's own origin.
    fn detect(&self, region: &GrayImage) -> Result<Vec<Feature>>;
}

/// Multi-scale FAST corner detector.
///
/// Runs the 16-point segment test over an image pyramid and suppresses
/// non-maximal responses per level, so features carry a scale-dependent size
/// usable as a crude scale invariant.
#[derive(Debug, Clone)]
pub struct FastDetector {
    threshold: u8,
}

impl FastDetector {
    pub fn new() -> Self {
        Self { threshold: 20 }
    }

    /// Intensity delta a circle pixel must clear to count as brighter or
    /// darker than the candidate centre.
    pub fn with_threshold(mut self, threshold: u8) -> Self {
        self.threshold = threshold;
        self
    }
}

impl Default for FastDetector {
    fn default() -> Self {
        Self::new()
    }
}

impl KeypointDetector for FastDetector {
    fn detect(&self, region: &GrayImage) -> Result<Vec<Feature>> {
        let (width, height) = region.dimensions();
        if width < MIN_REGION_DIM || height < MIN_REGION_DIM {
            return Err(CoreError::Detection(format!(
                "region {width}x{height} is below the {MIN_REGION_DIM}x{MIN_REGION_DIM} segment test minimum"
            )));
        }

        let mut features = Vec::new();
        for level in scale_levels(width, height) {
            let scaled;
            let image = if level.index == 0 {
                region
            } else {
                scaled = imageops::resize(
                    region,
                    level.width,
                    level.height,
                    FilterType::Triangle,
                );
                &scaled
            };

            let responses = segment_test(image, self.threshold);
            collect_maxima(&responses, level, &mut features);
        }

        Ok(features)
    }
}

#[derive(Debug, Clone, Copy)]
struct ScaleLevel {
    index: usize,
    /// Factor mapping level coordinates back to base coordinates.
    scale: f32,
    width: u32,
    height: u32,
}

/// Pyramid geometry for a region. The base level is always present; coarser
/// levels stop once either dimension drops below [`MIN_LEVEL_DIM`].
fn scale_levels(width: u32, height: u32) -> Vec<ScaleLevel> {
    let mut levels = vec![ScaleLevel {
        index: 0,
        scale: 1.0,
        width,
        height,
    }];

    let mut scale = SCALE_FACTOR;
    for index in 1..MAX_LEVELS {
        let scaled_width = (width as f32 / scale) as u32;
        let scaled_height = (height as f32 / scale) as u32;
        if scaled_width < MIN_LEVEL_DIM || scaled_height < MIN_LEVEL_DIM {
            break;
        }

        levels.push(ScaleLevel {
            index,
            scale,
            width: scaled_width,
            height: scaled_height,
        });
        scale *= SCALE_FACTOR;
    }

    levels
}

/// Per-pixel corner responses for one pyramid level. Zero means the pixel
/// failed the segment test.
fn segment_test(image: &GrayImage, threshold: u8) -> Vec<f32> {
    let (width, height) = image.dimensions();
    let data = image.as_raw();
    let stride = width as usize;
    let mut responses = vec![0.0f32; stride * height as usize];

    for y in 3..height.saturating_sub(3) {
        for x in 3..width - 3 {
            let centre = data[y as usize * stride + x as usize];
            let mut brighter = [false; 16];
            let mut darker = [false; 16];

            for (i, &(dx, dy)) in CIRCLE.iter().enumerate() {
                let sample = data[(y as i32 + dy) as usize * stride
                    + (x as i32 + dx) as usize];
                brighter[i] = sample >= centre.saturating_add(threshold);
                darker[i] = sample.saturating_add(threshold) <= centre;
            }

            if !has_contiguous_arc(&brighter) && !has_contiguous_arc(&darker) {
                continue;
            }

            let mut response = 0.0f32;
            for (i, &(dx, dy)) in CIRCLE.iter().enumerate() {
                if !brighter[i] && !darker[i] {
                    continue;
                }
                let sample = data[(y as i32 + dy) as usize * stride
                    + (x as i32 + dx) as usize];
                response += (f32::from(sample) - f32::from(centre)).abs();
            }

            responses[y as usize * stride + x as usize] = response;
        }
    }

    responses
}

/// Circular run test: at least [`ARC_LEN`] consecutive set flags, wrapping
/// around the circle.
fn has_contiguous_arc(flags: &[bool; 16]) -> bool {
    let mut run = 0u32;
    for i in 0..(16 + ARC_LEN as usize) {
        if flags[i % 16] {
            run += 1;
            if run >= ARC_LEN {
                return true;
            }
        } else {
            run = 0;
        }
    }
    false
}

/// 3x3 non-maximum suppression over a level's response map, emitting
/// surviving pixels as features in base-image coordinates.
fn collect_maxima(
    responses: &[f32],
    level: ScaleLevel,
    features: &mut Vec<Feature>,
) {
    let stride = level.width as usize;

    for y in 3..level.height.saturating_sub(3) as usize {
        for x in 3..level.width as usize - 3 {
            let response = responses[y * stride + x];
            if response <= 0.0 {
                continue;
            }

            // Strict comparison against earlier neighbours breaks plateau
            // ties deterministically in scan order.
            let mut is_maximum = true;
            'neighbours: for dy in -1i32..=1 {
                for dx in -1i32..=1 {
                    if dx == 0 && dy == 0 {
                        continue;
                    }
                    let neighbour = responses[(y as i32 + dy) as usize * stride
                        + (x as i32 + dx) as usize];
                    let earlier = dy < 0 || (dy == 0 && dx < 0);
                    if (earlier && neighbour >= response)
                        || (!earlier && neighbour > response)
                    {
                        is_maximum = false;
                        break 'neighbours;
                    }
                }
            }

            if is_maximum {
                features.push(Feature::new(
                    (x as f32 * level.scale, y as f32 * level.scale),
                    BASE_PATCH * level.scale,
                    response,
                ));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn blank(width: u32, height: u32) -> GrayImage {
        GrayImage::from_pixel(width, height, Luma([0]))
    }

    fn with_square(mut image: GrayImage, x0: u32, y0: u32, side: u32) -> GrayImage {
        for y in y0..y0 + side {
            for x in x0..x0 + side {
                image.put_pixel(x, y, Luma([255]));
            }
        }
        image
    }

    #[test]
    fn undersized_region_is_rejected() {
        let detector = FastDetector::new();
        let result = detector.detect(&blank(6, 100));
        assert!(matches!(result, Err(CoreError::Detection(_))));
    }

    #[test]
    fn blank_region_yields_no_features() {
        let detector = FastDetector::new();
        let features = detector.detect(&blank(64, 64)).unwrap();
        assert!(features.is_empty());
    }

    #[test]
    fn bright_dot_is_a_corner() {
        let mut image = blank(64, 64);
        image.put_pixel(32, 32, Luma([255]));

        let detector = FastDetector::new();
        let features = detector.detect(&image).unwrap();

        assert!(!features.is_empty());
        assert!(features
            .iter()
            .any(|f| (f.position.0 - 32.0).abs() < 2.0
                && (f.position.1 - 32.0).abs() < 2.0));
    }

    #[test]
    fn square_corners_are_detected_in_bounds() {
        let image = with_square(blank(64, 64), 20, 20, 20);

        let detector = FastDetector::new();
        let features = detector.detect(&image).unwrap();

        assert!(!features.is_empty());
        for feature in &features {
            assert!(feature.position.0 >= 0.0 && feature.position.0 < 64.0);
            assert!(feature.position.1 >= 0.0 && feature.position.1 < 64.0);
            assert!(feature.size >= BASE_PATCH);
            assert!(feature.strength > 0.0);
        }
    }

    #[test]
    fn detection_is_deterministic() {
        let image = with_square(blank(96, 96), 10, 40, 30);

        let detector = FastDetector::new();
        let first = detector.detect(&image).unwrap();
        let second = detector.detect(&image).unwrap();

        assert_eq!(first, second);
    }

    #[test]
    fn higher_threshold_never_adds_features() {
        let image = with_square(blank(64, 64), 16, 16, 24);

        let lenient = FastDetector::new().with_threshold(10);
        let strict = FastDetector::new().with_threshold(80);

        let many = lenient.detect(&image).unwrap();
        let few = strict.detect(&image).unwrap();

        assert!(few.len() <= many.len());
    }

    #[test]
    fn small_regions_use_the_base_level_only() {
        // Too small for any coarser pyramid level, still detectable.
        let image = with_square(blank(20, 20), 6, 6, 8);

        let detector = FastDetector::new();
        let features = detector.detect(&image).unwrap();

        for feature in &features {
            assert_eq!(feature.size, BASE_PATCH);
        }
    }
}
