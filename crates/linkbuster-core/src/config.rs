use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// Global configuration loaded from `~/.config/linkbuster/config.toml`.
///
/// Values are read once at startup; the cache TTL in particular is fixed for
/// the lifetime of a process run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkbusterConfig {
    /// Base URL of the remote scoring service (endpoints are appended to it).
    pub api_base_url: String,
    /// Hard timeout for `POST /scan`, in seconds.
    pub scan_timeout_secs: u64,
    /// Hard timeout for the `GET /status` connectivity probe, in seconds.
    pub probe_timeout_secs: u64,
    /// Lifetime of a cached scan result, in seconds.
    pub cache_ttl_secs: u64,
    /// Period of the background cache sweep, in seconds.
    pub sweep_interval_secs: u64,
    /// Period of the keepalive no-op, in seconds.
    pub keepalive_interval_secs: u64,
    /// How long an active warning stays up before it auto-dismisses, in seconds.
    pub notification_expiry_secs: u64,
    /// Optional location of the SQLite key-value store (None = XDG state dir).
    pub store_path: Option<PathBuf>,
}

impl Default for LinkbusterConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:5000/api".to_string(),
            scan_timeout_secs: 10,
            probe_timeout_secs: 5,
            cache_ttl_secs: 300,
            sweep_interval_secs: 60,
            keepalive_interval_secs: 20,
            notification_expiry_secs: 30,
            store_path: None,
        }
    }
}

impl LinkbusterConfig {
    pub fn scan_timeout(&self) -> Duration {
        Duration::from_secs(self.scan_timeout_secs)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs.max(1))
    }

    pub fn notification_expiry(&self) -> Duration {
        Duration::from_secs(self.notification_expiry_secs)
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("linkbuster")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Path of the bus socket used by `linkbuster run`.
pub fn default_bus_socket_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("linkbuster")?;
    Ok(xdg_dirs.get_state_home().join("bus.sock"))
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<LinkbusterConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = LinkbusterConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }

    let data = fs::read_to_string(&path)?;
    let cfg: LinkbusterConfig = toml::from_str(&data)?;
    Ok(cfg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let cfg = LinkbusterConfig::default();
        assert_eq!(cfg.api_base_url, "http://localhost:5000/api");
        assert_eq!(cfg.scan_timeout(), Duration::from_secs(10));
        assert_eq!(cfg.probe_timeout(), Duration::from_secs(5));
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(300));
        assert_eq!(cfg.sweep_interval(), Duration::from_secs(60));
        assert_eq!(cfg.keepalive_interval(), Duration::from_secs(20));
        assert_eq!(cfg.notification_expiry(), Duration::from_secs(30));
        assert!(cfg.store_path.is_none());
    }

    #[test]
    fn config_toml_roundtrip() {
        let cfg = LinkbusterConfig::default();
        let toml = toml::to_string_pretty(&cfg).unwrap();
        let parsed: LinkbusterConfig = toml::from_str(&toml).unwrap();
        assert_eq!(parsed.api_base_url, cfg.api_base_url);
        assert_eq!(parsed.cache_ttl_secs, cfg.cache_ttl_secs);
        assert_eq!(parsed.notification_expiry_secs, cfg.notification_expiry_secs);
    }

    #[test]
    fn config_toml_custom_values() {
        let toml = r#"
            api_base_url = "https://scanner.internal/api"
            scan_timeout_secs = 3
            probe_timeout_secs = 1
            cache_ttl_secs = 60
            sweep_interval_secs = 15
            keepalive_interval_secs = 20
            notification_expiry_secs = 10
            store_path = "/tmp/linkbuster/store.db"
        "#;
        let cfg: LinkbusterConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.api_base_url, "https://scanner.internal/api");
        assert_eq!(cfg.scan_timeout(), Duration::from_secs(3));
        assert_eq!(cfg.cache_ttl(), Duration::from_secs(60));
        assert_eq!(
            cfg.store_path.as_deref(),
            Some(std::path::Path::new("/tmp/linkbuster/store.db"))
        );
    }

    #[test]
    fn zero_intervals_are_clamped_for_timers() {
        let cfg = LinkbusterConfig {
            sweep_interval_secs: 0,
            keepalive_interval_secs: 0,
            ..LinkbusterConfig::default()
        };
        assert_eq!(cfg.sweep_interval(), Duration::from_secs(1));
        assert_eq!(cfg.keepalive_interval(), Duration::from_secs(1));
    }
}
