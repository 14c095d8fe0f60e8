use std::{
    env, fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, anyhow};
use tracing::debug;

use crate::models::{ConfigSource, ScorexConfig};

/// Evaluation order for configuration:
/// 1) an explicit path (usually from the command line),
/// 2) `$SCOREX_CONFIG_PATH` (TOML or JSON file),
/// 3) `$SCOREX_CONFIG_JSON` (inline JSON),
/// 4) a default candidate file in the working directory,
/// 5) built-in defaults.
///
/// `$SCOREX_OSC_HOST` and `$SCOREX_OSC_PORT` then override the destination
/// whatever the source.
pub fn load(
    explicit_path: Option<&Path>,
) -> anyhow::Result<(ScorexConfig, ConfigSource)> {
    let (mut config, source) = load_without_overrides(explicit_path)?;
    override_osc(
        &mut config,
        env::var("SCOREX_OSC_HOST").ok(),
        env::var("SCOREX_OSC_PORT").ok(),
    )?;
    Ok((config, source))
}

fn load_without_overrides(
    explicit_path: Option<&Path>,
) -> anyhow::Result<(ScorexConfig, ConfigSource)> {
    if let Some(path) = explicit_path {
        let config = load_from_file(path)?;
        return Ok((config, ConfigSource::Cli(path.to_path_buf())));
    }

    if let Ok(path_str) = env::var("SCOREX_CONFIG_PATH")
        && !path_str.trim().is_empty()
    {
        let path = PathBuf::from(path_str);
        let config = load_from_file(&path)?;
        return Ok((config, ConfigSource::EnvPath(path)));
    }

    if let Ok(raw) = env::var("SCOREX_CONFIG_JSON")
        && !raw.trim().is_empty()
    {
        let parsed =
            parse_json(&raw).context("failed to parse SCOREX_CONFIG_JSON")?;
        return Ok((parsed, ConfigSource::EnvInline));
    }

    if let Some(path) = find_default_file() {
        debug!(path = %path.display(), "using default config file");
        let config = load_from_file(&path)?;
        return Ok((config, ConfigSource::File(path)));
    }

    Ok((ScorexConfig::default(), ConfigSource::Default))
}

pub fn load_from_file(path: &Path) -> anyhow::Result<ScorexConfig> {
    let contents = fs::read_to_string(path).with_context(|| {
        format!("failed to read config from {}", path.display())
    })?;

    let config = match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => parse_json(&contents)
            .with_context(|| format!("invalid config {}", path.display()))?,
        Some("toml") | Some("tml") => {
            toml::from_str(&contents).map_err(|err| {
                anyhow!("invalid config {}: {}", path.display(), err)
            })?
        }
        _ => parse_from_str(&contents, &path.display().to_string())?,
    };

    Ok(config)
}

pub fn parse_from_str(
    contents: &str,
    origin: &str,
) -> anyhow::Result<ScorexConfig> {
    // Try TOML first, then JSON for convenience.
    toml::from_str(contents).or_else(|toml_err| {
        serde_json::from_str(contents).map_err(|json_err| {
            anyhow!(
                "failed to parse config {}: toml error: {}; json error: {}",
                origin,
                toml_err,
                json_err
            )
        })
    })
}

pub fn parse_json(raw: &str) -> anyhow::Result<ScorexConfig> {
    serde_json::from_str(raw).map_err(|err| anyhow!("invalid config json: {err}"))
}

fn override_osc(
    config: &mut ScorexConfig,
    host: Option<String>,
    port: Option<String>,
) -> anyhow::Result<()> {
    if let Some(host) = host
        && !host.trim().is_empty()
    {
        config.osc.host = host.trim().to_owned();
    }

    if let Some(port) = port
        && !port.trim().is_empty()
    {
        config.osc.port = port.trim().parse().with_context(|| {
            format!("invalid SCOREX_OSC_PORT value {port:?}")
        })?;
    }

    Ok(())
}

fn find_default_file() -> Option<PathBuf> {
    const CANDIDATES: &[&str] = &[
        "scorex.toml",
        "scorex.json",
        "config/scorex.toml",
        "config/scorex.json",
    ];

    CANDIDATES
        .iter()
        .map(Path::new)
        .find(|path| path.exists())
        .map(|path| path.to_path_buf())
}
