use anyhow::{Context, Result};
use layout_engine::BindingProfile;
use layout_protocol::SettlePolicy;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "csv-layout.toml";
pub const ENV_BRIDGE_ADDR: &str = "CSV_LAYOUT_BRIDGE_ADDR";
pub const ENV_BRIDGE_TIMEOUT_MS: &str = "CSV_LAYOUT_BRIDGE_TIMEOUT_MS";

const DEFAULT_BRIDGE_ADDR: &str = "127.0.0.1:7460";
const DEFAULT_BRIDGE_TIMEOUT_MS: u64 = 15_000;

fn default_true() -> bool {
    true
}

/// `csv-layout.toml`. Every section and key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub import: ImportDefaults,
    pub settle: SettlePolicy,
    pub binding: BindingProfile,
    pub bridge: BridgeConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ImportDefaults {
    pub auto_create: bool,
    pub update_position: bool,
    pub keep_structure: bool,
    pub enforce_order: bool,
    /// Preferred parent for root-level records.
    pub anchor: String,
    pub project: Option<PathBuf>,
    pub images_target: Option<PathBuf>,
}

impl Default for ImportDefaults {
    fn default() -> Self {
        Self {
            auto_create: false,
            update_position: default_true(),
            keep_structure: default_true(),
            enforce_order: default_true(),
            anchor: layout_graph::DEFAULT_ANCHOR_NAME.to_string(),
            project: None,
            images_target: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub addr: String,
    pub timeout_ms: u64,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_BRIDGE_ADDR.to_string(),
            timeout_ms: DEFAULT_BRIDGE_TIMEOUT_MS,
        }
    }
}

impl BridgeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms.max(1))
    }
}

impl LayoutConfig {
    /// Explicit file if given (it must exist), else `csv-layout.toml` in the
    /// working directory when present, else defaults. Environment overrides
    /// are applied last.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let local = Path::new(DEFAULT_CONFIG_FILE);
                if local.is_file() {
                    Self::from_file(local)?
                } else {
                    Self::default()
                }
            }
        };
        config.apply_env(|var| std::env::var(var).ok());
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read config {}", path.display()))?;
        let config: Self = toml::from_str(&raw)
            .with_context(|| format!("Invalid config {}", path.display()))?;
        log::debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(addr) = lookup(ENV_BRIDGE_ADDR)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
        {
            self.bridge.addr = addr;
        }
        if let Some(ms) = lookup(ENV_BRIDGE_TIMEOUT_MS)
            .and_then(|v| v.trim().parse::<u64>().ok())
            .filter(|ms| *ms > 0)
        {
            self.bridge.timeout_ms = ms;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_file_means_defaults() {
        let config: LayoutConfig = toml::from_str("").unwrap();
        assert_eq!(config, LayoutConfig::default());
        assert_eq!(config.settle, SettlePolicy::default());
        assert_eq!(config.import.anchor, "Canvas");
        assert!(config.import.update_position);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let raw = r#"
            [import]
            auto_create = true
            anchor = "UIRoot"

            [settle]
            after_refresh_ms = 500

            [binding]
            frame_suffix = "@abcde"

            [bridge]
            addr = "10.0.0.2:9000"
        "#;
        let config: LayoutConfig = toml::from_str(raw).unwrap();

        assert!(config.import.auto_create);
        assert!(config.import.enforce_order);
        assert_eq!(config.import.anchor, "UIRoot");
        assert_eq!(config.settle.after_refresh_ms, 500);
        assert_eq!(config.settle.after_node_create_ms, 100);
        assert_eq!(config.binding.frame_suffix, "@abcde");
        assert_eq!(config.binding.component, "cc.Sprite");
        assert_eq!(config.bridge.addr, "10.0.0.2:9000");
        assert_eq!(config.bridge.timeout_ms, DEFAULT_BRIDGE_TIMEOUT_MS);
    }

    #[test]
    fn env_overrides_bridge_settings() {
        let mut config = LayoutConfig::default();
        config.apply_env(|var| match var {
            ENV_BRIDGE_ADDR => Some(" 127.0.0.1:9999 ".to_string()),
            ENV_BRIDGE_TIMEOUT_MS => Some("2500".to_string()),
            _ => None,
        });
        assert_eq!(config.bridge.addr, "127.0.0.1:9999");
        assert_eq!(config.bridge.timeout(), Duration::from_millis(2_500));
    }

    #[test]
    fn blank_or_zero_env_values_are_ignored() {
        let mut config = LayoutConfig::default();
        config.apply_env(|var| match var {
            ENV_BRIDGE_ADDR => Some("  ".to_string()),
            ENV_BRIDGE_TIMEOUT_MS => Some("0".to_string()),
            _ => None,
        });
        assert_eq!(config.bridge, BridgeConfig::default());
    }

    #[test]
    fn explicit_missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(LayoutConfig::load(Some(&dir.path().join("nope.toml"))).is_err());
    }
}
