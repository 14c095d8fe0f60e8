//! Shared configuration library for scorex.
//!
//! This crate centralizes config loading and validation so the binary and
//! any embedding code agree on defaults, file discovery, and override
//! precedence.

pub mod loader;
pub mod models;

pub use loader::{load, load_from_file, parse_from_str, parse_json};
pub use models::{
    ConfigSource, OscConfig, PageEntry, ScanConfig, ScoreConfig, ScorexConfig,
};
