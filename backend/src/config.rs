//! Configuration for the RoastMyWallet API.

use config::{Config as ConfigLoader, ConfigError, Environment, File};
use serde::Deserialize;

/// Main configuration structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub llm: LlmConfig,
    pub oidc: OidcConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub cors: CorsConfig,
    #[serde(default)]
    pub quota: QuotaConfig,
    #[serde(default)]
    pub billing: BillingConfig,
}

/// Model gateway connection. The gateway speaks the OpenAI chat-completions
/// protocol; which model sits behind it is deployment detail.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_llm_model")]
    pub model: String,
}

/// OIDC provider used for Bearer-token validation.
#[derive(Debug, Clone, Deserialize)]
pub struct OidcConfig {
    pub issuer: String,
    #[serde(default)]
    pub audience: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CorsConfig {
    /// Comma-separated origin list, or "*".
    #[serde(default = "default_cors_origins")]
    pub origins: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            origins: default_cors_origins(),
        }
    }
}

/// Free-tier upload allowance.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaConfig {
    #[serde(default = "default_free_monthly_uploads")]
    pub free_monthly_uploads: i64,
}

impl Default for QuotaConfig {
    fn default() -> Self {
        Self {
            free_monthly_uploads: default_free_monthly_uploads(),
        }
    }
}

/// Payment collaborator boundary. The secret key is read per call, never held
/// in a long-lived client (the provider documents the credential as
/// non-cacheable).
#[derive(Debug, Clone, Deserialize, Default)]
pub struct BillingConfig {
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub secret_key: String,
    #[serde(default)]
    pub webhook_secret: String,
    #[serde(default)]
    pub premium_price_id: String,
    #[serde(default)]
    pub report_price_id: String,
}

// Default values
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_llm_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_llm_model() -> String {
    "llama3.2".to_string()
}
fn default_database_url() -> String {
    "sqlite:data/roastmywallet.db".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_cors_origins() -> String {
    "*".to_string()
}
fn default_free_monthly_uploads() -> i64 {
    2
}

impl Config {
    /// Load configuration from file and environment variables.
    ///
    /// Configuration sources (in order of precedence):
    /// 1. Environment variables (ROAST__SECTION__KEY format)
    /// 2. config.toml file (if present)
    /// 3. Built-in defaults
    pub fn load() -> Result<Self, ConfigError> {
        let config = ConfigLoader::builder()
            .set_default("host", default_host())?
            .set_default("port", default_port() as i64)?
            .set_default("llm.base_url", default_llm_base_url())?
            .set_default("llm.api_key", "")?
            .set_default("llm.model", default_llm_model())?
            .set_default("oidc.audience", "")?
            .set_default("database.url", default_database_url())?
            .set_default("logging.level", default_log_level())?
            .set_default("cors.origins", default_cors_origins())?
            .set_default("quota.free_monthly_uploads", default_free_monthly_uploads())?
            .add_source(File::with_name("config").required(false))
            .add_source(
                Environment::with_prefix("ROAST")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_database_config() {
        let database = DatabaseConfig::default();
        assert_eq!(database.url, "sqlite:data/roastmywallet.db");
    }

    #[test]
    fn test_default_quota_config() {
        let quota = QuotaConfig::default();
        assert_eq!(quota.free_monthly_uploads, 2);
    }

    #[test]
    fn test_default_logging_and_cors() {
        assert_eq!(LoggingConfig::default().level, "info");
        assert_eq!(CorsConfig::default().origins, "*");
    }

    #[test]
    fn test_billing_config_defaults_to_unconfigured() {
        let billing = BillingConfig::default();
        assert!(billing.secret_key.is_empty());
        assert!(billing.webhook_secret.is_empty());
    }
}
