use anyhow::Result;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix for environment overrides, e.g. `CLIENT_PULSE__DATABASE__URL`
pub const ENV_PREFIX: &str = "CLIENT_PULSE";

/// Oracle provider that runs locally
pub const PROVIDER_LEXICON: &str = "lexicon";
/// Oracle provider backed by the Anthropic API
pub const PROVIDER_ANTHROPIC: &str = "anthropic";

/// Application configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
    pub analysis: AnalysisConfig,
    pub oracle: OracleSettings,
    pub digest: DigestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "text"
    pub file_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Newest messages considered per client
    pub message_window: usize,
    /// Clients analyzed at once by a batch run
    pub max_concurrent_clients: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleSettings {
    pub provider: String, // "lexicon" or "anthropic"
    pub api_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    /// Silence after which the lexicon oracle suggests a check-in
    pub check_in_after_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DigestConfig {
    pub default_format: String,
    pub output_directory: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/client_pulse.db".to_string(),
                max_connections: 10,
                connection_timeout_secs: 30,
            },
            logging: LoggingConfig {
                level: "info".to_string(),
                format: "text".to_string(),
                file_path: None,
            },
            analysis: AnalysisConfig {
                message_window: 30,
                max_concurrent_clients: 4,
            },
            oracle: OracleSettings {
                provider: PROVIDER_LEXICON.to_string(),
                api_url: "https://api.anthropic.com/v1/messages".to_string(),
                api_key: None,
                model: "claude-3-5-sonnet-20241022".to_string(),
                max_tokens: 2000,
                timeout_secs: 60,
                check_in_after_days: 21,
            },
            digest: DigestConfig {
                default_format: "markdown".to_string(),
                output_directory: "./digests".to_string(),
            },
        }
    }
}

impl AppConfig {
    /// Load configuration from multiple sources with precedence
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration, optionally reading one extra file last
    ///
    /// Precedence, lowest first: built-in defaults, `config/default`,
    /// `config/local`, `client-pulse`, the explicit file, then
    /// `CLIENT_PULSE__*` environment variables.
    pub fn load_from(path: Option<&Path>) -> Result<Self> {
        let defaults = Config::try_from(&Self::default())
            .map_err(|e| anyhow::anyhow!("Failed to build default configuration: {}", e))?;

        let mut builder = Config::builder()
            .add_source(defaults)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(File::with_name("client-pulse").required(false));

        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }

        let config = builder
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to load configuration: {}", e))?;

        let mut app_config: Self = config
            .try_deserialize()
            .map_err(|e| anyhow::anyhow!("Failed to deserialize configuration: {}", e))?;

        app_config.database.url = app_config.get_database_url();
        app_config.oracle.api_key = app_config.get_api_key();

        app_config.validate()?;

        Ok(app_config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        // Validate database config
        if self.database.url.trim().is_empty() {
            return Err(anyhow::anyhow!("database url must not be empty"));
        }
        if self.database.max_connections == 0 {
            return Err(anyhow::anyhow!("max_connections must be greater than 0"));
        }
        if self.database.connection_timeout_secs == 0 {
            return Err(anyhow::anyhow!("connection_timeout_secs must be greater than 0"));
        }

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log level: {}. Must be one of: {:?}",
                self.logging.level,
                valid_levels
            ));
        }

        let valid_formats = ["text", "json"];
        if !valid_formats.contains(&self.logging.format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid log format: {}. Must be one of: {:?}",
                self.logging.format,
                valid_formats
            ));
        }

        // Validate analysis config
        if self.analysis.message_window == 0 {
            return Err(anyhow::anyhow!("message_window must be greater than 0"));
        }
        if self.analysis.max_concurrent_clients == 0 {
            return Err(anyhow::anyhow!("max_concurrent_clients must be greater than 0"));
        }

        // Validate oracle config
        let valid_providers = [PROVIDER_LEXICON, PROVIDER_ANTHROPIC];
        if !valid_providers.contains(&self.oracle.provider.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid oracle provider: {}. Must be one of: {:?}",
                self.oracle.provider,
                valid_providers
            ));
        }
        if self.oracle.provider == PROVIDER_ANTHROPIC
            && self.oracle.api_key.as_deref().map_or(true, |k| k.trim().is_empty())
        {
            return Err(anyhow::anyhow!(
                "The anthropic oracle needs an API key (oracle.api_key or ANTHROPIC_API_KEY)"
            ));
        }
        if self.oracle.timeout_secs == 0 {
            return Err(anyhow::anyhow!("oracle timeout_secs must be greater than 0"));
        }
        if self.oracle.max_tokens == 0 {
            return Err(anyhow::anyhow!("oracle max_tokens must be greater than 0"));
        }
        if self.oracle.check_in_after_days < 1 {
            return Err(anyhow::anyhow!("check_in_after_days must be at least 1"));
        }

        // Validate digest config
        let valid_formats = ["markdown", "json", "csv"];
        if !valid_formats.contains(&self.digest.default_format.as_str()) {
            return Err(anyhow::anyhow!(
                "Invalid digest format: {}. Must be one of: {:?}",
                self.digest.default_format,
                valid_formats
            ));
        }

        Ok(())
    }

    /// Get database URL from environment or config
    pub fn get_database_url(&self) -> String {
        std::env::var("DATABASE_URL").unwrap_or_else(|_| self.database.url.clone())
    }

    /// Get the oracle API key from environment or config
    pub fn get_api_key(&self) -> Option<String> {
        std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|key| !key.trim().is_empty())
            .or_else(|| self.oracle.api_key.clone())
    }

    /// Get log level from environment or config
    pub fn get_log_level(&self) -> String {
        std::env::var("RUST_LOG").unwrap_or_else(|_| self.logging.level.clone())
    }

    /// Render the effective configuration as YAML, with the API key masked
    pub fn to_yaml(&self) -> Result<String> {
        let mut shown = self.clone();
        if shown.oracle.api_key.is_some() {
            shown.oracle.api_key = Some("********".to_string());
        }
        serde_yaml::to_string(&shown)
            .map_err(|e| anyhow::anyhow!("Failed to render configuration: {}", e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.database.url, "sqlite:data/client_pulse.db");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.analysis.message_window, 30);
    }

    #[test]
    fn test_config_validation() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_config() {
        let mut config = AppConfig::default();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }
}
