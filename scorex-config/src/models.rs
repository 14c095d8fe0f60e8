use std::path::PathBuf;
use std::time::Duration;

use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Source that produced the loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ConfigSource {
    #[default]
    Default,
    /// Path given on the command line.
    Cli(PathBuf),
    /// Path taken from `$SCOREX_CONFIG_PATH`.
    EnvPath(PathBuf),
    /// Inline JSON from `$SCOREX_CONFIG_JSON`.
    EnvInline,
    /// A default candidate file found in the working directory.
    File(PathBuf),
}

/// Top-level scorex settings.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ScorexConfig {
    pub score: ScoreConfig,
    pub scan: ScanConfig,
    pub osc: OscConfig,
}

impl ScorexConfig {
    /// Reject settings the engine cannot run with. Called once after
    /// loading, before anything is constructed from the values.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.scan.tick_interval_ms == 0 {
            bail!("scan.tick_interval_ms must be greater than zero");
        }

        // Edge-clipped windows keep at least half the configured width, and
        // the detector needs a handful of columns to work with.
        if self.scan.window_width < 14 {
            bail!(
                "scan.window_width must be at least 14, got {}",
                self.scan.window_width
            );
        }

        if !(self.score.default_duration_secs > 0.0) {
            bail!(
                "score.default_duration_secs must be positive, got {}",
                self.score.default_duration_secs
            );
        }

        for (index, page) in self.score.pages.iter().enumerate() {
            if let Some(duration) = page.duration_secs
                && !(duration > 0.0)
            {
                bail!(
                    "score.pages[{index}] duration must be positive, got {duration}"
                );
            }
        }

        if self.osc.port == 0 {
            bail!("osc.port must be a concrete port, got 0");
        }

        Ok(())
    }
}

/// The score itself: pages and their traversal times.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScoreConfig {
    /// Pages in playback order.
    pub pages: Vec<PageEntry>,
    /// Traversal time, in seconds, for pages without their own duration.
    pub default_duration_secs: f32,
}

impl Default for ScoreConfig {
    fn default() -> Self {
        Self {
            pages: Vec::new(),
            default_duration_secs: 10.0,
        }
    }
}

impl ScoreConfig {
    pub fn default_duration(&self) -> Duration {
        Duration::from_secs_f32(self.default_duration_secs)
    }
}

/// One page of the score.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PageEntry {
    pub path: PathBuf,
    /// Seconds the scan window takes to cross this page; falls back to
    /// `default_duration_secs` when absent.
    #[serde(default)]
    pub duration_secs: Option<f32>,
}

impl PageEntry {
    pub fn duration(&self) -> Option<Duration> {
        self.duration_secs.map(Duration::from_secs_f32)
    }
}

/// Scan engine tuning.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Milliseconds between scan ticks.
    pub tick_interval_ms: u64,
    /// Scan window width in page pixels.
    pub window_width: u32,
    /// Continue onto the next page when the window leaves the current one.
    pub auto_advance: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 100,
            window_width: 60,
            auto_advance: false,
        }
    }
}

impl ScanConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

/// Where the OSC parameter stream goes.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OscConfig {
    pub host: String,
    pub port: u16,
}

impl Default for OscConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_owned(),
            port: 8000,
        }
    }
}

impl OscConfig {
    /// Host/port pair in the form `ToSocketAddrs` resolves.
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        ScorexConfig::default().validate().unwrap();
    }

    #[test]
    fn default_values_match_the_documented_baseline() {
        let config = ScorexConfig::default();

        assert_eq!(config.scan.tick_interval(), Duration::from_millis(100));
        assert_eq!(config.scan.window_width, 60);
        assert!(!config.scan.auto_advance);
        assert_eq!(config.score.default_duration(), Duration::from_secs(10));
        assert_eq!(config.osc.endpoint(), "127.0.0.1:8000");
    }

    #[test]
    fn zero_tick_interval_is_rejected() {
        let mut config = ScorexConfig::default();
        config.scan.tick_interval_ms = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn narrow_window_is_rejected() {
        let mut config = ScorexConfig::default();
        config.scan.window_width = 13;
        assert!(config.validate().is_err());
    }

    #[test]
    fn non_positive_page_duration_is_rejected() {
        let mut config = ScorexConfig::default();
        config.score.pages.push(PageEntry {
            path: PathBuf::from("page.png"),
            duration_secs: Some(0.0),
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn nan_default_duration_is_rejected() {
        let mut config = ScorexConfig::default();
        config.score.default_duration_secs = f32::NAN;
        assert!(config.validate().is_err());
    }
}
