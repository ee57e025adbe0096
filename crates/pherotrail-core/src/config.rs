//! Loading navigation config from JSON.

use pherotrail_logic::config::NavConfig;
use pherotrail_logic::NavError;

/// Parse and validate a `NavConfig`. Missing fields keep their defaults.
pub fn load_config(json: &str) -> Result<NavConfig, NavError> {
    let config: NavConfig = serde_json::from_str(json)
        .map_err(|e| NavError::config(format!("invalid config JSON: {}", e)))?;
    config.validate()?;
    Ok(config)
}

/// Pretty-printed JSON for a config, e.g. to dump the effective settings.
pub fn config_to_json(config: &NavConfig) -> Result<String, NavError> {
    serde_json::to_string_pretty(config)
        .map_err(|e| NavError::config(format!("cannot serialize config: {}", e)))
}
