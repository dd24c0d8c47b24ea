use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;

use crate::reconciler::ReconcilerConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub marketplace: MarketplaceConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    "0.0.0.0".parse().unwrap()
}

fn default_port() -> u16 {
    8080
}

/// Database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("crowdlift.db")
}

/// Remote micro-task marketplace configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MarketplaceConfig {
    /// Marketplace API base URL (e.g., "https://api.taskmarket.example")
    pub url: String,
    /// Marketplace API key
    pub api_key: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    /// Defaults applied to every campaign created by the lifecycle controller
    #[serde(default)]
    pub campaign_defaults: CampaignDefaults,
}

fn default_timeout() -> u32 {
    30
}

/// Campaign parameters sent to the marketplace on creation.
///
/// The marketplace rejects campaigns below its pay floor with a
/// `ValidationFailed` response, which is surfaced to the operator verbatim.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CampaignDefaults {
    /// Marketplace task category
    #[serde(default = "default_category_id")]
    pub category_id: u32,
    /// Pay per completed task, in cents
    #[serde(default = "default_pay_per_task_cents")]
    pub pay_per_task_cents: u32,
    /// Minutes a worker has to finish a task
    #[serde(default = "default_minutes_to_finish")]
    pub minutes_to_finish: u32,
    /// Hours the employer has to rate a submission
    #[serde(default = "default_time_to_rate_hours")]
    pub time_to_rate_hours: u32,
}

impl Default for CampaignDefaults {
    fn default() -> Self {
        Self {
            category_id: default_category_id(),
            pay_per_task_cents: default_pay_per_task_cents(),
            minutes_to_finish: default_minutes_to_finish(),
            time_to_rate_hours: default_time_to_rate_hours(),
        }
    }
}

fn default_category_id() -> u32 {
    1
}

fn default_pay_per_task_cents() -> u32 {
    10
}

fn default_minutes_to_finish() -> u32 {
    15
}

fn default_time_to_rate_hours() -> u32 {
    72
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub marketplace: SanitizedMarketplaceConfig,
    pub reconciler: ReconcilerConfig,
}

/// Sanitized marketplace config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedMarketplaceConfig {
    pub url: String,
    pub api_key_configured: bool,
    pub timeout_secs: u32,
    pub campaign_defaults: CampaignDefaults,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            database: config.database.clone(),
            marketplace: SanitizedMarketplaceConfig {
                url: config.marketplace.url.clone(),
                api_key_configured: !config.marketplace.api_key.is_empty(),
                timeout_secs: config.marketplace.timeout_secs,
                campaign_defaults: config.marketplace.campaign_defaults.clone(),
            },
            reconciler: config.reconciler.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_valid_config() {
        let toml = r#"
[marketplace]
url = "https://api.taskmarket.example"
api_key = "test-key"

[server]
host = "127.0.0.1"
port = 9000
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.marketplace.url, "https://api.taskmarket.example");
        assert_eq!(config.marketplace.timeout_secs, 30); // default
        assert_eq!(config.server.port, 9000);
        assert_eq!(config.server.host.to_string(), "127.0.0.1");
    }

    #[test]
    fn test_deserialize_with_default_server() {
        let toml = r#"
[marketplace]
url = "https://api.taskmarket.example"
api_key = "test-key"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host.to_string(), "0.0.0.0");
    }

    #[test]
    fn test_deserialize_missing_marketplace_fails() {
        let toml = r#"
[server]
port = 8080
"#;
        let result: Result<Config, _> = toml::from_str(toml);
        assert!(result.is_err());
    }

    #[test]
    fn test_campaign_defaults() {
        let toml = r#"
[marketplace]
url = "https://api.taskmarket.example"
api_key = "test-key"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        let defaults = &config.marketplace.campaign_defaults;
        assert_eq!(defaults.pay_per_task_cents, 10);
        assert_eq!(defaults.minutes_to_finish, 15);
        assert_eq!(defaults.time_to_rate_hours, 72);
    }

    #[test]
    fn test_deserialize_with_custom_database_path() {
        let toml = r#"
[marketplace]
url = "https://api.taskmarket.example"
api_key = "test-key"

[database]
path = "/data/my-db.sqlite"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.database.path.to_str().unwrap(), "/data/my-db.sqlite");
    }

    #[test]
    fn test_sanitized_config_hides_api_key() {
        let config = Config {
            marketplace: MarketplaceConfig {
                url: "https://api.taskmarket.example".to_string(),
                api_key: "secret-key".to_string(),
                timeout_secs: 60,
                campaign_defaults: CampaignDefaults::default(),
            },
            server: ServerConfig::default(),
            database: DatabaseConfig::default(),
            reconciler: ReconcilerConfig::default(),
        };

        let sanitized = SanitizedConfig::from(&config);
        assert_eq!(sanitized.marketplace.url, "https://api.taskmarket.example");
        assert!(sanitized.marketplace.api_key_configured);
        assert_eq!(sanitized.marketplace.timeout_secs, 60);

        let json = serde_json::to_string(&sanitized).unwrap();
        assert!(!json.contains("secret-key"));
    }

    #[test]
    fn test_deserialize_reconciler_section() {
        let toml = r#"
[marketplace]
url = "https://api.taskmarket.example"
api_key = "test-key"

[reconciler]
enabled = false
poll_interval_secs = 120
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(!config.reconciler.enabled);
        assert_eq!(config.reconciler.poll_interval_secs, 120);
    }
}
