use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Marketplace URL and API key are non-empty
/// - Reconciler poll interval is not 0
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Marketplace validation
    if config.marketplace.url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "marketplace.url cannot be empty".to_string(),
        ));
    }
    if config.marketplace.api_key.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "marketplace.api_key cannot be empty".to_string(),
        ));
    }
    if config.marketplace.campaign_defaults.pay_per_task_cents == 0 {
        return Err(ConfigError::ValidationError(
            "marketplace.campaign_defaults.pay_per_task_cents cannot be 0".to_string(),
        ));
    }

    // Reconciler validation
    if config.reconciler.poll_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "reconciler.poll_interval_secs cannot be 0".to_string(),
        ));
    }

    Ok(())
}
