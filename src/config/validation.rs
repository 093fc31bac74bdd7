use super::{AppConfig, ConfigError};

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_server_config(config)?;
    validate_upstream(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn validate_server_config(config: &AppConfig) -> Result<(), ConfigError> {
    let server = &config.server;
    if server.port == 0 {
        return Err(validation_err("server.port must be greater than 0"));
    }
    if server.host.trim().is_empty() {
        return Err(validation_err("server.host cannot be empty"));
    }
    if server.timeout_secs == 0 {
        return Err(validation_err("server.timeout_secs must be greater than 0"));
    }
    if server.http_pool_max_idle_per_host == 0 {
        return Err(validation_err(
            "server.http_pool_max_idle_per_host must be greater than 0",
        ));
    }
    if server.max_frame_bytes == 0 {
        return Err(validation_err("server.max_frame_bytes must be greater than 0"));
    }
    if server.index_path.trim().is_empty() {
        return Err(validation_err("server.index_path cannot be empty"));
    }
    Ok(())
}

fn validate_upstream(config: &AppConfig) -> Result<(), ConfigError> {
    let upstream = &config.upstream;
    if upstream.api_key.trim().is_empty() {
        return Err(validation_err("upstream api_key cannot be empty"));
    }
    let url = upstream.url();
    let parsed = url::Url::parse(url)
        .map_err(|err| validation_err(format!("upstream url '{url}' is not a valid URL: {err}")))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(validation_err(
            "upstream url must start with http:// or https://",
        ));
    }
    if upstream.prompt.trim().is_empty() {
        return Err(validation_err("upstream.prompt cannot be empty"));
    }
    if !(0.0..=1.0).contains(&upstream.top_p) {
        return Err(validation_err("upstream.top_p must be within [0, 1]"));
    }
    Ok(())
}

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let valid_levels = ["DEBUG", "INFO", "WARNING", "ERROR", "CRITICAL", "DISABLED"];
    if !valid_levels.contains(&config.features.log_level.to_uppercase().as_str()) {
        return Err(validation_err(format!(
            "log_level must be one of {valid_levels:?}"
        )));
    }
    Ok(())
}
