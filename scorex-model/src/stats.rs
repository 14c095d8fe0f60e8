use crate::feature::Feature;

/// Aggregated size statistics for one detection pass.
///
/// One snapshot is produced per scan tick (or per static analysis) and is
/// immediately handed to the transmitter; snapshots are never retained.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatsSnapshot {
    /// Number of detected features.
    pub count: usize,
    /// Smallest feature size, `0.0` when nothing was detected.
    pub min_size: f32,
    /// Arithmetic mean of feature sizes, `0.0` when nothing was detected.
    pub avg_size: f32,
    /// Largest feature size, `0.0` when nothing was detected.
    pub max_size: f32,
}

impl StatsSnapshot {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Reduce a detection pass into its summary metrics.
///
/// An empty input is valid and yields the all-zero snapshot; this is not an
/// error condition.
pub fn aggregate(features: &[Feature]) -> StatsSnapshot {
    if features.is_empty() {
        return StatsSnapshot::default();
    }

    let mut min_size = f32::INFINITY;
    let mut max_size = f32::NEG_INFINITY;
    let mut sum = 0.0f64;

    for feature in features {
        min_size = min_size.min(feature.size);
        max_size = max_size.max(feature.size);
        sum += f64::from(feature.size);
    }

    StatsSnapshot {
        count: features.len(),
        min_size,
        avg_size: (sum / features.len() as f64) as f32,
        max_size,
    }
}

/// Whole-page analysis produced by static mode.
///
/// Only `object_count` goes on the wire; contrast and proximity are surfaced
/// to the control surface for operator feedback.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PageAnalysis {
    /// Number of features found on the whole page.
    pub object_count: usize,
    /// Standard deviation of grayscale intensity over the page.
    pub contrast: f32,
    /// Mean keypoint distance from the page centre, `0.0` for an empty page.
    pub proximity: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(size: f32) -> Feature {
        Feature::new((0.0, 0.0), size, 1.0)
    }

    #[test]
    fn empty_input_yields_zero_snapshot() {
        let snapshot = aggregate(&[]);

        assert_eq!(snapshot.count, 0);
        assert_eq!(snapshot.min_size, 0.0);
        assert_eq!(snapshot.avg_size, 0.0);
        assert_eq!(snapshot.max_size, 0.0);
        assert!(snapshot.is_empty());
    }

    #[test]
    fn extrema_and_mean() {
        let snapshot = aggregate(&[feature(2.0), feature(4.0), feature(6.0)]);

        assert_eq!(snapshot.count, 3);
        assert_eq!(snapshot.min_size, 2.0);
        assert_eq!(snapshot.max_size, 6.0);
        assert!((snapshot.avg_size - 4.0).abs() < 1e-6);
    }

    #[test]
    fn single_feature_collapses_extrema() {
        let snapshot = aggregate(&[feature(3.5)]);

        assert_eq!(snapshot.count, 1);
        assert_eq!(snapshot.min_size, 3.5);
        assert_eq!(snapshot.avg_size, 3.5);
        assert_eq!(snapshot.max_size, 3.5);
    }

    #[test]
    fn min_never_exceeds_avg_or_max() {
        let sizes = [0.5, 12.25, 3.0, 3.0, 7.75, 1.125];
        let features: Vec<Feature> =
            sizes.iter().map(|s| feature(*s)).collect();

        let snapshot = aggregate(&features);

        assert!(snapshot.min_size <= snapshot.avg_size);
        assert!(snapshot.avg_size <= snapshot.max_size);

        let mean: f32 = sizes.iter().sum::<f32>() / sizes.len() as f32;
        assert!((snapshot.avg_size - mean).abs() < 1e-5);
    }
}
