use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    /// Seconds between periodic snapshot dumps. Zero switches to
    /// synchronous mode: the snapshot is written after every accepted
    /// update instead.
    #[serde(default = "default_store_interval")]
    pub store_interval_secs: u64,
    #[serde(default = "default_snapshot_path")]
    pub snapshot_path: String,
    /// Restore the store from the snapshot file before serving.
    #[serde(default = "default_restore")]
    pub restore: bool,
    /// Shared secret; when set, unsigned or mis-signed POSTs are
    /// rejected.
    #[serde(default)]
    pub sign_key: Option<String>,
    /// SQLite file for the write-through audit backend; `/ping` reports
    /// its health. No backend when absent.
    #[serde(default)]
    pub database_path: Option<String>,
}

fn default_listen_addr() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_store_interval() -> u64 {
    300
}

fn default_snapshot_path() -> String {
    "data/metrics-db.json".to_string()
}

fn default_restore() -> bool {
    true
}

impl ServerConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config: ServerConfig = toml::from_str("").unwrap();
        assert_eq!(config.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.store_interval_secs, 300);
        assert_eq!(config.snapshot_path, "data/metrics-db.json");
        assert!(config.restore);
        assert!(config.sign_key.is_none());
        assert!(config.database_path.is_none());
    }

    #[test]
    fn sync_dump_mode_is_store_interval_zero() {
        let config: ServerConfig = toml::from_str("store_interval_secs = 0").unwrap();
        assert_eq!(config.store_interval_secs, 0);
    }
}
