use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::fs;
use tracing::warn;

#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct KernelConfig {
    pub listen_port: u16,
    pub db_path: String,
    pub display: DisplayConf,
}

/// Locale-facing settings, injected rather than compiled in: the dashboard
/// of the reference deployment shows Oslo wall-clock time.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DisplayConf {
    /// IANA timezone identifier used for ETA and last-updated display.
    pub timezone: String,
    /// chrono strftime pattern for the last-updated display.
    pub datetime_format: String,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            listen_port: 8080,
            db_path: "./data/printdeck.db".into(),
            display: DisplayConf::default(),
        }
    }
}

impl Default for DisplayConf {
    fn default() -> Self {
        Self {
            timezone: "Europe/Oslo".into(),
            datetime_format: "%Y-%m-%d %H:%M".into(),
        }
    }
}

pub async fn load_config() -> KernelConfig {
    let path = std::env::var("PRINTDECK_KERNEL_CONFIG").unwrap_or_else(|_| "kernel.yaml".into());
    if Path::new(&path).exists() {
        let txt = fs::read_to_string(&path).await.unwrap_or_default();
        if txt.trim().is_empty() {
            return KernelConfig::default();
        }
        serde_yaml::from_str(&txt).unwrap_or_else(|e| {
            warn!("invalid config {path}: {e}, using defaults");
            KernelConfig::default()
        })
    } else {
        warn!("no {path} found, using default config");
        KernelConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_fills_defaults() {
        let cfg: KernelConfig = serde_yaml::from_str("listen_port: 9090\n").unwrap();
        assert_eq!(cfg.listen_port, 9090);
        assert_eq!(cfg.display.timezone, "Europe/Oslo");
        assert_eq!(cfg.display.datetime_format, "%Y-%m-%d %H:%M");
    }
}
