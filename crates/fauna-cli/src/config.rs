//! Configuration Vault – reads/writes `~/.fauna/config.toml`.

use fauna_runtime::{AgentLoopConfig, TelemetryConfig};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Persisted configuration stored in `~/.fauna/config.toml`.
///
/// Every section is optional in the file; missing keys take their
/// defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scan cadence and the full world-model tuning.
    pub agent: AgentLoopConfig,
    /// Log format and optional OTLP endpoint.
    pub telemetry: TelemetryConfig,
}

impl Config {
    /// Check the world-model section.
    pub fn validate(&self) -> Result<(), String> {
        if !self.agent.scan_interval.is_finite() || self.agent.scan_interval < 0.0 {
            return Err(format!(
                "Invalid agent.scan_interval: {} (must be zero or positive)",
                self.agent.scan_interval
            ));
        }
        self.agent.world.validate().map_err(|e| e.to_string())
    }
}

/// Return the path to `~/.fauna/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub(crate) fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".fauna").join("config.toml")
}

/// Load the config from disk, apply environment overrides and validate.
/// Returns `None` if the file does not exist.
pub fn load() -> Result<Option<Config>, String> {
    load_from(&config_path())
}

/// Like [`load`], falling back to defaults (plus overrides) when the file
/// is absent.
pub fn load_or_default() -> Result<Config, String> {
    match load()? {
        Some(cfg) => Ok(cfg),
        None => {
            let mut cfg = Config::default();
            apply_env_overrides(&mut cfg)?;
            cfg.validate()?;
            Ok(cfg)
        }
    }
}

/// Load the config from a specific path.
pub(crate) fn load_from(path: &Path) -> Result<Option<Config>, String> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config at {}: {}", path.display(), e))?;
    let mut cfg: Config = toml::from_str(&raw).map_err(|e| format!("Failed to parse config: {}", e))?;
    apply_env_overrides(&mut cfg)?;
    cfg.validate()?;
    Ok(Some(cfg))
}

/// Apply `FAUNA_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `FAUNA_MAX_ITEMS` | `agent.world.index.max_memory_items` |
/// | `FAUNA_SCAN_INTERVAL` | `agent.scan_interval` |
/// | `FAUNA_LOG_FORMAT` | `telemetry.log_format` (`compact` / `json`) |
/// | `FAUNA_OTLP_ENDPOINT` | `telemetry.otlp_endpoint` |
pub fn apply_env_overrides(cfg: &mut Config) -> Result<(), String> {
    apply_overrides(cfg, |key| std::env::var(key).ok())
}

/// Override logic behind [`apply_env_overrides`], reading variables through
/// `lookup`. Unparseable values are reported, not ignored.
pub(crate) fn apply_overrides<F>(cfg: &mut Config, lookup: F) -> Result<(), String>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(v) = lookup("FAUNA_MAX_ITEMS") {
        cfg.agent.world.index.max_memory_items = v
            .trim()
            .parse()
            .map_err(|e| format!("Invalid FAUNA_MAX_ITEMS '{v}': {e}"))?;
    }
    if let Some(v) = lookup("FAUNA_SCAN_INTERVAL") {
        cfg.agent.scan_interval = v
            .trim()
            .parse()
            .map_err(|e| format!("Invalid FAUNA_SCAN_INTERVAL '{v}': {e}"))?;
    }
    if let Some(v) = lookup("FAUNA_LOG_FORMAT") {
        cfg.telemetry.log_format = v.parse().map_err(|e| format!("Invalid FAUNA_LOG_FORMAT: {e}"))?;
    }
    if let Some(v) = lookup("FAUNA_OTLP_ENDPOINT")
        && !v.trim().is_empty()
    {
        cfg.telemetry.otlp_endpoint = Some(v);
    }
    Ok(())
}

/// Serialise `cfg` as TOML.
pub fn to_toml(cfg: &Config) -> Result<String, String> {
    toml::to_string_pretty(cfg).map_err(|e| format!("Failed to serialize config: {}", e))
}

/// Save the config to disk, creating `~/.fauna/` if necessary.
pub fn save(cfg: &Config) -> Result<PathBuf, String> {
    let path = config_path();
    save_to(cfg, &path)?;
    Ok(path)
}

/// Save the config to a specific path.
pub(crate) fn save_to(cfg: &Config, path: &Path) -> Result<(), String> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| format!("Failed to create config directory: {}", e))?;
    }
    let raw = to_toml(cfg)?;
    fs::write(path, raw).map_err(|e| format!("Failed to write config at {}: {}", path.display(), e))
}
