use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_server_address")]
    pub server_address: String,
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
    #[serde(default = "default_report_interval")]
    pub report_interval_secs: u64,
    /// Batched mode POSTs the whole report as one array; per-metric mode
    /// POSTs every metric on its own, with independent failures.
    #[serde(default = "default_batch_update")]
    pub batch_update: bool,
    /// Number of concurrent delivery workers.
    #[serde(default = "default_workers")]
    pub workers: usize,
    /// Shared secret for request signing; unsigned when absent.
    #[serde(default)]
    pub sign_key: Option<String>,
    /// Gzip-frame request bodies.
    #[serde(default)]
    pub gzip: bool,
}

fn default_server_address() -> String {
    "localhost:8080".to_string()
}

fn default_poll_interval() -> u64 {
    2
}

fn default_report_interval() -> u64 {
    10
}

fn default_batch_update() -> bool {
    true
}

fn default_workers() -> usize {
    1
}

impl AgentConfig {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Builds the HTTP base URL from `server_address`.
    ///
    /// A bare `:port` means localhost, and an address without a scheme
    /// gets `http://`.
    pub fn http_base_url(&self) -> String {
        let addr = self.server_address.trim();
        if addr.contains("://") {
            return addr.trim_end_matches('/').to_string();
        }
        if let Some(port) = addr.strip_prefix(':') {
            return format!("http://localhost:{port}");
        }
        format!("http://{addr}")
    }
}
