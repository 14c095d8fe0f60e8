use std::time::Duration;

/// Engine activity mode.
///
/// Dispatch over modes is exhaustive so additional modes stay additive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScanMode {
    #[default]
    Idle,
    Static,
    Scanning,
}

/// Direction the scan window travels across a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ScanDirection {
    #[default]
    Forward,
    Reverse,
}

impl ScanDirection {
    /// Starting position implied by this direction on a page of the given
    /// width. The reverse edge is the last in-bounds column so the position
    /// invariant `[0, page_width)` holds from the first tick.
    pub fn leading_edge(&self, page_width: f32) -> f32 {
        match self {
            ScanDirection::Forward => 0.0,
            ScanDirection::Reverse => page_width - 1.0,
        }
    }

    /// Signed unit factor applied to the per-tick step.
    pub fn signum(&self) -> f32 {
        match self {
            ScanDirection::Forward => 1.0,
            ScanDirection::Reverse => -1.0,
        }
    }

    pub fn flipped(&self) -> Self {
        match self {
            ScanDirection::Forward => ScanDirection::Reverse,
            ScanDirection::Reverse => ScanDirection::Forward,
        }
    }
}

/// Mutable scan position and timing state.
///
/// Created once at startup and owned exclusively by the scan engine task;
/// every mutation happens between ticks, never inside one.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ScanState {
    pub mode: ScanMode,
    pub direction: ScanDirection,
    /// Window centre in image coordinates, always within `[0, page_width)`.
    pub position: f32,
    /// Time spent in the current scan run.
    pub elapsed: Duration,
    /// Index of the page currently under the window.
    pub page_index: usize,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Re-seat the position at the leading edge for the current direction.
    pub fn rewind(&mut self, page_width: f32) {
        self.position = self.direction.leading_edge(page_width);
        self.elapsed = Duration::ZERO;
    }

    pub fn is_scanning(&self) -> bool {
        self.mode == ScanMode::Scanning
    }
}

/// Discrete user intent delivered by the control surface.
///
/// Commands carry no payload; the engine interprets them against its own
/// state between ticks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ControlCommand {
    /// Run one whole-page analysis pass and return to idle.
    Static,
    /// Begin (or restart) continuous scanning from the leading edge.
    Scan,
    /// Flip the scan direction without moving the window.
    Reverse,
    /// Force the forward direction without moving the window.
    Forward,
    NextPage,
    PrevPage,
    /// Stop all activity and shut the engine down.
    Quit,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn leading_edge_by_direction() {
        assert_eq!(ScanDirection::Forward.leading_edge(1000.0), 0.0);
        assert_eq!(ScanDirection::Reverse.leading_edge(1000.0), 999.0);
    }

    #[test]
    fn double_flip_restores_direction() {
        let dir = ScanDirection::Forward;
        assert_eq!(dir.flipped().flipped(), dir);
    }

    #[test]
    fn rewind_reseats_position_and_clock() {
        let mut state = ScanState {
            mode: ScanMode::Scanning,
            direction: ScanDirection::Reverse,
            position: 512.0,
            elapsed: Duration::from_secs(3),
            page_index: 1,
        };

        state.rewind(1424.0);

        assert_eq!(state.position, 1423.0);
        assert_eq!(state.elapsed, Duration::ZERO);
        // Mode and page are untouched; rewinding is not a transition.
        assert_eq!(state.mode, ScanMode::Scanning);
        assert_eq!(state.page_index, 1);
    }
}
