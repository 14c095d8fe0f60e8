/// A single detected visual feature on a score page.
///
/// Produced fresh by a detector call and consumed within the same tick;
/// never persisted.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Feature {
    /// Position in image coordinates (x, y).
    pub position: (f32, f32),
    /// Apparent size of the feature in pixels, non-negative.
    pub size: f32,
    /// Detector response strength. Scale is detector-specific.
    pub strength: f32,
}

impl Feature {
    pub fn new(position: (f32, f32), size: f32, strength: f32) -> Self {
        Feature {
            position,
            size,
            strength,
        }
    }
}
