use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub broker: BrokerConfig,
    #[serde(default)]
    pub polling: PollingConfig,
    #[serde(default)]
    pub session: SessionConfig,
}

/// Pazpar2 broker connection
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BrokerConfig {
    /// Broker endpoint (e.g., "http://localhost:9004/search.pz2")
    pub url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Pazpar2 service id sent with `init`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<String>,
}

fn default_timeout() -> u64 {
    30
}

/// Poll periods and limits for the stat, show and termlist aggregates
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PollingConfig {
    #[serde(default = "default_interval")]
    pub stat_interval_ms: u64,
    #[serde(default = "default_interval")]
    pub show_interval_ms: u64,
    #[serde(default = "default_interval")]
    pub termlist_interval_ms: u64,
    /// Give up after this many ticks without convergence (0 = unlimited)
    #[serde(default = "default_max_ticks")]
    pub max_ticks: u32,
    /// Give up after this many seconds without convergence (0 = unlimited)
    #[serde(default = "default_poll_timeout")]
    pub timeout_secs: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            stat_interval_ms: default_interval(),
            show_interval_ms: default_interval(),
            termlist_interval_ms: default_interval(),
            max_ticks: default_max_ticks(),
            timeout_secs: default_poll_timeout(),
        }
    }
}

impl PollingConfig {
    pub fn stat_interval(&self) -> Duration {
        Duration::from_millis(self.stat_interval_ms)
    }

    pub fn show_interval(&self) -> Duration {
        Duration::from_millis(self.show_interval_ms)
    }

    pub fn termlist_interval(&self) -> Duration {
        Duration::from_millis(self.termlist_interval_ms)
    }
}

fn default_interval() -> u64 {
    1000
}

fn default_max_ticks() -> u32 {
    600
}

fn default_poll_timeout() -> u64 {
    300
}

/// Session to resume on startup
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SessionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Validate `id` with a ping before reusing it
    #[serde(default)]
    pub safe: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_minimal_config() {
        let toml = r#"
[broker]
url = "http://localhost:9004/search.pz2"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.broker.url, "http://localhost:9004/search.pz2");
        assert_eq!(config.broker.timeout_secs, 30);
        assert!(config.broker.service.is_none());
        assert_eq!(config.polling.stat_interval_ms, 1000);
        assert_eq!(config.polling.max_ticks, 600);
        assert!(config.session.id.is_none());
        assert!(!config.session.safe);
    }

    #[test]
    fn test_deserialize_full_config() {
        let toml = r#"
[broker]
url = "http://pz2.example.org/search.pz2"
timeout_secs = 10
service = "opac"

[polling]
stat_interval_ms = 250
show_interval_ms = 500
termlist_interval_ms = 750
max_ticks = 0
timeout_secs = 60

[session]
id = "296887961"
safe = true
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.broker.service.as_deref(), Some("opac"));
        assert_eq!(config.polling.stat_interval_ms, 250);
        assert_eq!(config.polling.show_interval_ms, 500);
        assert_eq!(config.polling.termlist_interval_ms, 750);
        assert_eq!(config.polling.max_ticks, 0);
        assert_eq!(config.polling.timeout_secs, 60);
        assert_eq!(config.session.id.as_deref(), Some("296887961"));
        assert!(config.session.safe);
    }

    #[test]
    fn test_deserialize_missing_broker_fails() {
        let toml = r#"
[polling]
stat_interval_ms = 100
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }
}
