use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Defines the supported realtime conversation backends.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Backend {
    OpenAI,
    Azure,
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub backend: Backend,
    pub openai_api_key: Option<String>,
    pub openai_realtime_model: String,
    pub azure_api_key: Option<String>,
    pub azure_endpoint: Option<String>,
    pub azure_deployment: Option<String>,
    pub voice: String,
    pub transcription_model: String,
    pub dataset_path: PathBuf,
    pub prompts_path: PathBuf,
    pub log_level: Level,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let backend_str =
            std::env::var("REALTIME_BACKEND").unwrap_or_else(|_| "openai".to_string());
        let backend = match backend_str.to_lowercase().as_str() {
            "azure" => Backend::Azure,
            _ => Backend::OpenAI,
        };

        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let openai_realtime_model = std::env::var("OPENAI_REALTIME_MODEL")
            .unwrap_or_else(|_| "gpt-4o-realtime-preview-2024-10-01".to_string());
        let azure_api_key = std::env::var("AZURE_OPENAI_API_KEY").ok();
        let azure_endpoint = std::env::var("AZURE_OPENAI_ENDPOINT").ok();
        let azure_deployment = std::env::var("AZURE_OPENAI_DEPLOYMENT").ok();

        let voice = std::env::var("VOICE").unwrap_or_else(|_| "alloy".to_string());
        let transcription_model =
            std::env::var("TRANSCRIPTION_MODEL").unwrap_or_else(|_| "whisper-1".to_string());

        let dataset_path = std::env::var("DATASET_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/sculptures.json"));
        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        match backend {
            Backend::OpenAI => {
                if openai_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "OPENAI_API_KEY must be set for the 'openai' backend".to_string(),
                    ));
                }
            }
            Backend::Azure => {
                if azure_api_key.is_none() {
                    return Err(ConfigError::MissingVar(
                        "AZURE_OPENAI_API_KEY must be set for the 'azure' backend".to_string(),
                    ));
                }
                if azure_endpoint.is_none() {
                    return Err(ConfigError::MissingVar(
                        "AZURE_OPENAI_ENDPOINT must be set for the 'azure' backend".to_string(),
                    ));
                }
                if azure_deployment.is_none() {
                    return Err(ConfigError::MissingVar(
                        "AZURE_OPENAI_DEPLOYMENT must be set for the 'azure' backend".to_string(),
                    ));
                }
            }
        }

        Ok(Self {
            bind_address,
            backend,
            openai_api_key,
            openai_realtime_model,
            azure_api_key,
            azure_endpoint,
            azure_deployment,
            voice,
            transcription_model,
            dataset_path,
            prompts_path,
            log_level,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use tracing::Level;

    fn clear_env_vars() {
        unsafe {
            env::remove_var("BIND_ADDRESS");
            env::remove_var("REALTIME_BACKEND");
            env::remove_var("OPENAI_API_KEY");
            env::remove_var("OPENAI_REALTIME_MODEL");
            env::remove_var("AZURE_OPENAI_API_KEY");
            env::remove_var("AZURE_OPENAI_ENDPOINT");
            env::remove_var("AZURE_OPENAI_DEPLOYMENT");
            env::remove_var("VOICE");
            env::remove_var("TRANSCRIPTION_MODEL");
            env::remove_var("DATASET_PATH");
            env::remove_var("PROMPTS_PATH");
            env::remove_var("RUST_LOG");
        }
    }

    fn set_minimal_env_openai() {
        unsafe {
            env::set_var("REALTIME_BACKEND", "openai");
            env::set_var("OPENAI_API_KEY", "test-openai-key");
        }
    }

    #[test]
    fn test_config_error_display() {
        let missing_var = ConfigError::MissingVar("TEST_VAR".to_string());
        assert_eq!(
            format!("{}", missing_var),
            "Missing environment variable: TEST_VAR"
        );

        let invalid_value =
            ConfigError::InvalidValue("TEST_VAR".to_string(), "bad_value".to_string());
        assert_eq!(
            format!("{}", invalid_value),
            "Invalid value for environment variable TEST_VAR: bad_value"
        );
    }

    #[test]
    #[serial]
    fn test_config_from_env_minimal_openai() {
        clear_env_vars();
        set_minimal_env_openai();

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "0.0.0.0:3000");
        assert_eq!(config.backend, Backend::OpenAI);
        assert_eq!(config.openai_api_key, Some("test-openai-key".to_string()));
        assert_eq!(
            config.openai_realtime_model,
            "gpt-4o-realtime-preview-2024-10-01"
        );
        assert_eq!(config.voice, "alloy");
        assert_eq!(config.transcription_model, "whisper-1");
        assert_eq!(config.dataset_path, PathBuf::from("./data/sculptures.json"));
        assert_eq!(config.prompts_path, PathBuf::from("./prompts"));
        assert_eq!(config.log_level, Level::INFO);
    }

    #[test]
    #[serial]
    fn test_config_from_env_azure_backend() {
        clear_env_vars();
        unsafe {
            env::set_var("REALTIME_BACKEND", "azure");
            env::set_var("AZURE_OPENAI_API_KEY", "test-azure-key");
            env::set_var("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com");
            env::set_var("AZURE_OPENAI_DEPLOYMENT", "gpt-4o-realtime");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.backend, Backend::Azure);
        assert_eq!(config.azure_api_key, Some("test-azure-key".to_string()));
        assert_eq!(
            config.azure_endpoint,
            Some("https://example.openai.azure.com".to_string())
        );
        assert_eq!(config.azure_deployment, Some("gpt-4o-realtime".to_string()));
        assert_eq!(config.openai_api_key, None);
    }

    #[test]
    #[serial]
    fn test_config_from_env_custom_values() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "127.0.0.1:8080");
            env::set_var("REALTIME_BACKEND", "openai");
            env::set_var("OPENAI_API_KEY", "custom-openai-key");
            env::set_var("OPENAI_REALTIME_MODEL", "gpt-4o-realtime-custom");
            env::set_var("VOICE", "verse");
            env::set_var("TRANSCRIPTION_MODEL", "whisper-large");
            env::set_var("DATASET_PATH", "/custom/data.json");
            env::set_var("PROMPTS_PATH", "/custom/prompts");
            env::set_var("RUST_LOG", "debug");
        }

        let config = Config::from_env().expect("Config should load successfully");

        assert_eq!(config.bind_address.to_string(), "127.0.0.1:8080");
        assert_eq!(config.openai_realtime_model, "gpt-4o-realtime-custom");
        assert_eq!(config.voice, "verse");
        assert_eq!(config.transcription_model, "whisper-large");
        assert_eq!(config.dataset_path, PathBuf::from("/custom/data.json"));
        assert_eq!(config.prompts_path, PathBuf::from("/custom/prompts"));
        assert_eq!(config.log_level, Level::DEBUG);
    }

    #[test]
    #[serial]
    fn test_config_invalid_bind_address() {
        clear_env_vars();
        unsafe {
            env::set_var("BIND_ADDRESS", "not-a-valid-address");
            env::set_var("OPENAI_API_KEY", "test-openai-key");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "BIND_ADDRESS"),
            _ => panic!("Expected InvalidValue for BIND_ADDRESS"),
        }
    }

    #[test]
    #[serial]
    fn test_config_invalid_log_level() {
        clear_env_vars();
        unsafe {
            env::set_var("OPENAI_API_KEY", "test-openai-key");
            env::set_var("RUST_LOG", "not-a-level");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::InvalidValue(var, _) => assert_eq!(var, "RUST_LOG"),
            _ => panic!("Expected InvalidValue for RUST_LOG"),
        }
    }

    #[test]
    #[serial]
    fn test_config_missing_openai_key() {
        clear_env_vars();
        unsafe {
            env::set_var("REALTIME_BACKEND", "openai");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => assert!(msg.contains("OPENAI_API_KEY")),
            _ => panic!("Expected MissingVar for OPENAI_API_KEY"),
        }
    }

    #[test]
    #[serial]
    fn test_config_missing_azure_endpoint() {
        clear_env_vars();
        unsafe {
            env::set_var("REALTIME_BACKEND", "azure");
            env::set_var("AZURE_OPENAI_API_KEY", "test-azure-key");
        }

        let err = Config::from_env().unwrap_err();
        match err {
            ConfigError::MissingVar(msg) => assert!(msg.contains("AZURE_OPENAI_ENDPOINT")),
            _ => panic!("Expected MissingVar for AZURE_OPENAI_ENDPOINT"),
        }
    }
}
