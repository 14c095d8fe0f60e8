use uuid::Uuid;

use crate::stats::PageAnalysis;

/// Notifications the engine pushes back to the control surface.
///
/// These are informational; the engine never blocks on their delivery and a
/// closed receiver is not an error.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(
    feature = "serde",
    serde(tag = "type", rename_all = "snake_case")
)]
pub enum EngineEvent {
    ScanStarted { scan_id: Uuid, page_index: usize },
    /// The scan window left the page and the engine returned to idle.
    ScanFinished { scan_id: Uuid },
    PageChanged { page_index: usize },
    StaticAnalyzed(PageAnalysis),
    /// A whole-page static pass failed; the engine stayed idle.
    StaticFailed,
    /// Repeated detector failures forced the scan back to idle.
    ///
    /// Recoverable: the engine keeps accepting commands afterwards.
    DetectorStalled { failures: u32 },
    /// The engine processed `Quit` and is shutting down.
    Stopped,
}
