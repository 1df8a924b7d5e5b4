use std::time::Duration;
use study_buddy_core::SessionSettings;
use study_buddy_core::llm_client::GEMINI_OPENAI_API_BASE;
use study_buddy_core::search::SearchSettings;
use tracing::Level;

const MISSING_API_KEY_HELP: &str = "GEMINI_API_KEY is not set.\n\
Please do one of the following:\n  \
1. Create a .env file: cp .env.example .env\n     \
Then edit .env and add your API key\n  \
2. Export the variable: export GEMINI_API_KEY='your-key'\n  \
3. Get your API key from: https://aistudio.google.com/app/apikey";

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub api_base: String,
    pub default_max_results: usize,
    pub search_max_retries: u32,
    /// Base backoff delay in seconds.
    pub search_retry_delay: f64,
    pub memory_limit: usize,
    pub min_quiz_options: usize,
    pub max_quiz_options: usize,
    pub max_input_retries: usize,
    pub log_level: Level,
}

impl Config {
    /// Builds a config with default tunables around an API key.
    pub fn with_api_key(gemini_api_key: impl Into<String>) -> Self {
        Self {
            gemini_api_key: gemini_api_key.into(),
            gemini_model: "gemini-1.5-flash".to_string(),
            api_base: GEMINI_OPENAI_API_BASE.to_string(),
            default_max_results: 3,
            search_max_retries: 3,
            search_retry_delay: 1.0,
            memory_limit: 10,
            min_quiz_options: 2,
            max_quiz_options: 6,
            max_input_retries: 3,
            log_level: Level::INFO,
        }
    }

    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let gemini_api_key = std::env::var("GEMINI_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| ConfigError::MissingVar(MISSING_API_KEY_HELP.to_string()))?;

        let defaults = Self::with_api_key(gemini_api_key);

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let config = Self {
            gemini_model: std::env::var("GEMINI_MODEL").unwrap_or(defaults.gemini_model.clone()),
            api_base: std::env::var("GEMINI_API_BASE").unwrap_or(defaults.api_base.clone()),
            default_max_results: env_or("DEFAULT_MAX_RESULTS", defaults.default_max_results)?,
            search_max_retries: env_or("SEARCH_MAX_RETRIES", defaults.search_max_retries)?,
            search_retry_delay: env_or("SEARCH_RETRY_DELAY", defaults.search_retry_delay)?,
            memory_limit: env_or("MEMORY_LIMIT", defaults.memory_limit)?,
            min_quiz_options: env_or("MIN_QUIZ_OPTIONS", defaults.min_quiz_options)?,
            max_quiz_options: env_or("MAX_QUIZ_OPTIONS", defaults.max_quiz_options)?,
            max_input_retries: env_or("MAX_INPUT_RETRIES", defaults.max_input_retries)?,
            log_level,
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks every tunable is in range.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.gemini_api_key.is_empty() {
            return Err(ConfigError::MissingVar(MISSING_API_KEY_HELP.to_string()));
        }
        ensure(self.default_max_results >= 1, "DEFAULT_MAX_RESULTS", "must be at least 1")?;
        ensure(self.search_max_retries >= 1, "SEARCH_MAX_RETRIES", "must be at least 1")?;
        ensure(
            Duration::try_from_secs_f64(self.search_retry_delay).is_ok(),
            "SEARCH_RETRY_DELAY",
            "must be a non-negative number of seconds that fits a duration",
        )?;
        ensure(self.memory_limit >= 1, "MEMORY_LIMIT", "must be at least 1")?;
        ensure(self.min_quiz_options >= 2, "MIN_QUIZ_OPTIONS", "must be at least 2")?;
        ensure(
            self.max_quiz_options >= self.min_quiz_options,
            "MAX_QUIZ_OPTIONS",
            "must be >= MIN_QUIZ_OPTIONS",
        )?;
        ensure(self.max_input_retries >= 1, "MAX_INPUT_RETRIES", "must be at least 1")?;
        Ok(())
    }

    pub fn search_settings(&self) -> Result<SearchSettings, ConfigError> {
        let retry_delay = Duration::try_from_secs_f64(self.search_retry_delay).map_err(|e| {
            ConfigError::InvalidValue("SEARCH_RETRY_DELAY".to_string(), e.to_string())
        })?;
        Ok(SearchSettings {
            max_results: self.default_max_results,
            max_retries: self.search_max_retries,
            retry_delay,
        })
    }

    pub fn session_settings(&self) -> SessionSettings {
        SessionSettings {
            memory_limit: self.memory_limit,
            max_input_retries: self.max_input_retries,
        }
    }
}

fn env_or<T>(var: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(var) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(var.to_string(), format!("'{}': {}", raw, e))),
        Err(_) => Ok(default),
    }
}

fn ensure(condition: bool, var: &str, reason: &str) -> Result<(), ConfigError> {
    if condition {
        Ok(())
    } else {
        Err(ConfigError::InvalidValue(var.to_string(), reason.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;

    const VARS: &[&str] = &[
        "GEMINI_API_KEY",
        "GEMINI_MODEL",
        "GEMINI_API_BASE",
        "DEFAULT_MAX_RESULTS",
        "SEARCH_MAX_RETRIES",
        "SEARCH_RETRY_DELAY",
        "MEMORY_LIMIT",
        "MIN_QUIZ_OPTIONS",
        "MAX_QUIZ_OPTIONS",
        "MAX_INPUT_RETRIES",
        "RUST_LOG",
    ];

    fn clear_env_vars() {
        for var in VARS {
            unsafe {
                env::remove_var(var);
            }
        }
    }

    fn set_vars(pairs: &[(&str, &str)]) {
        for (key, value) in pairs {
            unsafe {
                env::set_var(key, value);
            }
        }
    }

    #[test]
    fn test_config_error_display() {
        let invalid_value =
            ConfigError::InvalidValue("MEMORY_LIMIT".to_string(), "must be at least 1".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable MEMORY_LIMIT: must be at least 1"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_defaults() {
        clear_env_vars();
        set_vars(&[("GEMINI_API_KEY", "test-key")]);

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.gemini_api_key, "test-key");
        assert_eq!(config.gemini_model, "gemini-1.5-flash");
        assert_eq!(config.api_base, GEMINI_OPENAI_API_BASE);
        assert_eq!(config.default_max_results, 3);
        assert_eq!(config.search_max_retries, 3);
        assert_eq!(config.search_retry_delay, 1.0);
        assert_eq!(config.memory_limit, 10);
        assert_eq!(config.min_quiz_options, 2);
        assert_eq!(config.max_quiz_options, 6);
        assert_eq!(config.max_input_retries, 3);
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        set_vars(&[
            ("GEMINI_API_KEY", "custom-key"),
            ("GEMINI_MODEL", "gemini-2.0-flash"),
            ("DEFAULT_MAX_RESULTS", "5"),
            ("SEARCH_MAX_RETRIES", "4"),
            ("SEARCH_RETRY_DELAY", "0.5"),
            ("MEMORY_LIMIT", "20"),
            ("MAX_INPUT_RETRIES", "2"),
            ("RUST_LOG", "debug"),
        ]);

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.gemini_model, "gemini-2.0-flash");
        assert_eq!(config.default_max_results, 5);
        assert_eq!(config.log_level, Level::DEBUG);
        assert_eq!(
            config.search_settings().unwrap(),
            SearchSettings {
                max_results: 5,
                max_retries: 4,
                retry_delay: Duration::from_millis(500),
            }
        );
        assert_eq!(
            config.session_settings(),
            SessionSettings {
                memory_limit: 20,
                max_input_retries: 2,
            }
        );
    }

    #[test]
    #[serial]
    fn test_config_missing_api_key() {
        clear_env_vars();

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => {
                assert!(msg.contains("GEMINI_API_KEY is not set."));
                assert!(msg.contains("https://aistudio.google.com/app/apikey"));
            }
            _ => panic!("Expected MissingVar for GEMINI_API_KEY"),
        }
    }

    #[test]
    #[serial]
    fn test_config_unparseable_number() {
        clear_env_vars();
        set_vars(&[("GEMINI_API_KEY", "k"), ("MEMORY_LIMIT", "lots")]);

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "MEMORY_LIMIT"),
            _ => panic!("Expected InvalidValue for MEMORY_LIMIT"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        set_vars(&[("GEMINI_API_KEY", "k"), ("RUST_LOG", "not-a-level")]);

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
    }

    #[test]
    fn test_config_validation() {
        assert!(Config::with_api_key("k").validate().is_ok());

        let cases: Vec<(&str, Box<dyn Fn(&mut Config)>)> = vec![
            ("DEFAULT_MAX_RESULTS", Box::new(|c: &mut Config| c.default_max_results = 0)),
            ("SEARCH_MAX_RETRIES", Box::new(|c: &mut Config| c.search_max_retries = 0)),
            ("SEARCH_RETRY_DELAY", Box::new(|c: &mut Config| c.search_retry_delay = -1.0)),
            ("SEARCH_RETRY_DELAY", Box::new(|c: &mut Config| c.search_retry_delay = f64::NAN)),
            ("SEARCH_RETRY_DELAY", Box::new(|c: &mut Config| c.search_retry_delay = 1e30)),
            ("MEMORY_LIMIT", Box::new(|c: &mut Config| c.memory_limit = 0)),
            ("MIN_QUIZ_OPTIONS", Box::new(|c: &mut Config| c.min_quiz_options = 1)),
            ("MAX_QUIZ_OPTIONS", Box::new(|c: &mut Config| c.max_quiz_options = 1)),
            ("MAX_INPUT_RETRIES", Box::new(|c: &mut Config| c.max_input_retries = 0)),
        ];

        for (expected_var, mutate) in cases {
            let mut config = Config::with_api_key("k");
            mutate(&mut config);
            match config.validate() {
                Err(ConfigError::InvalidValue(var, _)) => assert_eq!(var, expected_var),
                other => panic!("Expected InvalidValue for {}, got {:?}", expected_var, other),
            }
        }

        assert!(matches!(
            Config::with_api_key("").validate(),
            Err(ConfigError::MissingVar(_))
        ));
    }

    #[test]
    fn test_oversized_retry_delay_is_rejected_not_zeroed() {
        let mut config = Config::with_api_key("k");
        config.search_retry_delay = 1e30;

        assert!(config.validate().is_err());
        match config.search_settings() {
            Err(ConfigError::InvalidValue(var, _)) => assert_eq!(var, "SEARCH_RETRY_DELAY"),
            other => panic!("Expected InvalidValue for SEARCH_RETRY_DELAY, got {:?}", other),
        }
    }
}
