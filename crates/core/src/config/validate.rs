use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Broker URL is not empty
/// - Broker timeout is not 0
/// - Poll intervals are not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.broker.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "broker.url cannot be empty".to_string(),
        ));
    }

    if config.broker.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "broker.timeout_secs cannot be 0".to_string(),
        ));
    }

    let intervals = [
        ("polling.stat_interval_ms", config.polling.stat_interval_ms),
        ("polling.show_interval_ms", config.polling.show_interval_ms),
        (
            "polling.termlist_interval_ms",
            config.polling.termlist_interval_ms,
        ),
    ];
    for (name, value) in intervals {
        if value == 0 {
            return Err(ConfigError::ValidationError(format!(
                "{} cannot be 0",
                name
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BrokerConfig, PollingConfig, SessionConfig};

    fn config() -> Config {
        Config {
            broker: BrokerConfig {
                url: "http://localhost:9004/search.pz2".to_string(),
                timeout_secs: 30,
                service: None,
            },
            polling: PollingConfig::default(),
            session: SessionConfig::default(),
        }
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&config()).is_ok());
    }

    #[test]
    fn test_validate_empty_url_fails() {
        let mut config = config();
        config.broker.url = "  ".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn test_validate_zero_interval_fails() {
        let mut config = config();
        config.polling.termlist_interval_ms = 0;
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("polling.termlist_interval_ms"));
    }

    #[test]
    fn test_validate_zero_timeout_fails() {
        let mut config = config();
        config.broker.timeout_secs = 0;
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_limits_allowed() {
        let mut config = config();
        config.polling.max_ticks = 0;
        config.polling.timeout_secs = 0;
        assert!(validate_config(&config).is_ok());
    }
}
