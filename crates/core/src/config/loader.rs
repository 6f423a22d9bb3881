use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Prefix of environment overrides. Nested keys are joined with `__`, so
/// `CURTAIN_BROKER__TIMEOUT_SECS` sets `broker.timeout_secs`.
pub const ENV_PREFIX: &str = "CURTAIN_";

/// `CURTAIN_CONFIG` names the file itself and is not a setting.
const IGNORED_ENV: &[&str] = &["config"];

/// Load a TOML file, then apply `CURTAIN_*` overrides.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }
    extract(Figment::from(Toml::file(path)).merge(overrides()))
}

/// Build the configuration from `CURTAIN_*` variables alone.
///
/// At least `CURTAIN_BROKER__URL` must be set.
pub fn load_config_from_env() -> Result<Config, ConfigError> {
    extract(Figment::from(overrides()))
}

/// Parse a TOML document. The environment is not consulted.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

fn overrides() -> Env {
    Env::prefixed(ENV_PREFIX).split("__").ignore(IGNORED_ENV)
}

fn extract(figment: Figment) -> Result<Config, ConfigError> {
    figment.extract().map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use figment::providers::Serialized;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(body: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", body).unwrap();
        file
    }

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[broker]
url = "http://localhost:9004/search.pz2"

[polling]
show_interval_ms = 200
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.polling.show_interval_ms, 200);
        assert_eq!(config.polling.stat_interval_ms, 1000);
    }

    #[test]
    fn test_load_config_from_str_missing_broker() {
        let result = load_config_from_str("[session]\nsafe = true\n");
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/curtain.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        let file = write_config(
            r#"
[broker]
url = "http://127.0.0.1:9004/search.pz2"
timeout_secs = 5
service = "catalogue"

[session]
id = "abc"
safe = true
"#,
        );

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.broker.url, "http://127.0.0.1:9004/search.pz2");
        assert_eq!(config.broker.timeout_secs, 5);
        assert_eq!(config.broker.service.as_deref(), Some("catalogue"));
        assert_eq!(config.session.id.as_deref(), Some("abc"));
        assert!(config.session.safe);
    }

    #[test]
    fn test_file_error_names_the_bad_key() {
        let file = write_config(
            r#"
[broker]
url = "http://127.0.0.1:9004/search.pz2"
timeout_secs = "soon"
"#,
        );

        match load_config(file.path()) {
            Err(ConfigError::ParseError(message)) => assert!(message.contains("timeout_secs")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_later_layer_overrides_nested_key() {
        let file = write_config(
            r#"
[broker]
url = "http://127.0.0.1:9004/search.pz2"

[polling]
max_ticks = 10
"#,
        );
        let figment = Figment::from(Toml::file(file.path()))
            .merge(Serialized::default("polling.max_ticks", 25));

        let config = extract(figment).unwrap();
        assert_eq!(config.polling.max_ticks, 25);
        assert_eq!(config.broker.url, "http://127.0.0.1:9004/search.pz2");
    }
}
