use image::GrayImage;
use scorex_model::PageAnalysis;

use crate::detector::KeypointDetector;
use crate::error::Result;

/// Whole-page static pass: detect over the full image and derive the
/// page-level metrics surfaced to the operator.
pub fn analyze_page(
    detector: &dyn KeypointDetector,
    page: &GrayImage,
) -> Result<PageAnalysis> {
    let features = detector.detect(page)?;

    let centre = (
        page.width() as f32 / 2.0,
        page.height() as f32 / 2.0,
    );

    let proximity = if features.is_empty() {
        0.0
    } else {
        let sum: f64 = features
            .iter()
            .map(|f| {
                let dx = f64::from(f.position.0 - centre.0);
                let dy = f64::from(f.position.1 - centre.1);
                (dx * dx + dy * dy).sqrt()
            })
            .sum();
        (sum / features.len() as f64) as f32
    };

    Ok(PageAnalysis {
        object_count: features.len(),
        contrast: intensity_std(page),
        proximity,
    })
}

/// Standard deviation of grayscale intensity over the whole page.
fn intensity_std(page: &GrayImage) -> f32 {
    let pixels = page.as_raw();
    if pixels.is_empty() {
        return 0.0;
    }

    let count = pixels.len() as f64;
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    for &p in pixels {
        let v = f64::from(p);
        sum += v;
        sum_sq += v * v;
    }

    let mean = sum / count;
    let variance = (sum_sq / count - mean * mean).max(0.0);
    variance.sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;
    use scorex_model::Feature;

    use crate::error::CoreError;

    struct FixedDetector(Vec<Feature>);

    impl KeypointDetector for FixedDetector {
        fn detect(&self, _region: &GrayImage) -> Result<Vec<Feature>> {
            Ok(self.0.clone())
        }
    }

    struct FailingDetector;

    impl KeypointDetector for FailingDetector {
        fn detect(&self, _region: &GrayImage) -> Result<Vec<Feature>> {
            Err(CoreError::Detection("broken".into()))
        }
    }

    fn uniform(value: u8) -> GrayImage {
        GrayImage::from_pixel(100, 100, Luma([value]))
    }

    #[test]
    fn uniform_page_has_zero_contrast() {
        let analysis =
            analyze_page(&FixedDetector(Vec::new()), &uniform(128)).unwrap();

        assert_eq!(analysis.object_count, 0);
        assert_eq!(analysis.contrast, 0.0);
        assert_eq!(analysis.proximity, 0.0);
    }

    #[test]
    fn half_and_half_page_contrast() {
        let mut page = uniform(0);
        for y in 0..100 {
            for x in 50..100 {
                page.put_pixel(x, y, Luma([200]));
            }
        }

        let analysis =
            analyze_page(&FixedDetector(Vec::new()), &page).unwrap();

        // Two equal populations at 0 and 200: std is exactly 100.
        assert!((analysis.contrast - 100.0).abs() < 1e-3);
    }

    #[test]
    fn proximity_is_mean_distance_from_centre() {
        let features = vec![
            Feature::new((50.0, 50.0), 3.0, 1.0),
            Feature::new((50.0, 90.0), 3.0, 1.0),
            Feature::new((80.0, 50.0), 3.0, 1.0),
        ];

        let analysis =
            analyze_page(&FixedDetector(features), &uniform(10)).unwrap();

        assert_eq!(analysis.object_count, 3);
        // Distances from (50, 50): 0, 40, 30.
        assert!((analysis.proximity - 70.0 / 3.0).abs() < 1e-4);
    }

    #[test]
    fn detector_failure_propagates() {
        let result = analyze_page(&FailingDetector, &uniform(0));
        assert!(matches!(result, Err(CoreError::Detection(_))));
    }
}
