use config::{Config, ConfigError, Environment, File as ConfigFile};
use serde::Deserialize;
use std::time::Duration;

pub const DEFAULT_DATABASE_PATH: &str = "roll_call.db";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_path: String,
    /// When set, enrollment refuses student ids that have no student record yet.
    pub require_registered_student: bool,
    pub capture_delay_ms: u64,
    pub match_delay_ms: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_path: DEFAULT_DATABASE_PATH.to_string(),
            require_registered_student: false,
            capture_delay_ms: 1000,
            match_delay_ms: 1500,
        }
    }
}

impl AppConfig {
    pub fn capture_delay(&self) -> Duration {
        Duration::from_millis(self.capture_delay_ms)
    }

    pub fn match_delay(&self) -> Duration {
        Duration::from_millis(self.match_delay_ms)
    }
}

/// Load `RollCall.{toml,yaml,json}` if present, then `ROLL_CALL_*` overrides.
pub fn load_configuration() -> Result<AppConfig, ConfigError> {
    let defaults = AppConfig::default();
    let builder = Config::builder()
        .set_default("database_path", defaults.database_path)?
        .set_default(
            "require_registered_student",
            defaults.require_registered_student,
        )?
        .set_default("capture_delay_ms", defaults.capture_delay_ms)?
        .set_default("match_delay_ms", defaults.match_delay_ms)?
        .add_source(ConfigFile::with_name("RollCall").required(false))
        .add_source(Environment::with_prefix("ROLL_CALL").try_parsing(true))
        .build()?;
    builder.try_deserialize::<AppConfig>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_mock_hardware_timing() {
        let config = AppConfig::default();
        assert_eq!(config.database_path, "roll_call.db");
        assert!(!config.require_registered_student);
        assert_eq!(config.capture_delay(), Duration::from_secs(1));
        assert_eq!(config.match_delay(), Duration::from_millis(1500));
    }

    #[test]
    fn test_load_configuration_without_file_uses_defaults() {
        let config = load_configuration().unwrap();
        assert!(!config.database_path.is_empty());
    }
}
