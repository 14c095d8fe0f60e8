//! Core runtime for scorex.
//!
//! The crate is organised around a single [`engine::ScanEngine`] task that
//! owns all mutable state. Commands arrive over a channel, every tick crops
//! a window from the current page, runs the configured
//! [`detector::KeypointDetector`], and hands the aggregated statistics to a
//! [`transmit::ParameterSink`]. Events flow back out over a second channel
//! for whatever surface is driving the engine.

pub mod analysis;
pub mod detector;
pub mod engine;
pub mod error;
pub mod score;
pub mod transmit;

pub use analysis::analyze_page;
pub use detector::{FastDetector, KeypointDetector};
pub use engine::{EngineConfig, ScanEngine};
pub use error::{CoreError, Result};
pub use score::{PAGE_HEIGHT, PAGE_WIDTH, PageSource, ScorePage, ScoreSet};
pub use transmit::{OscTransmitter, ParameterSink};
