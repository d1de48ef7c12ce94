use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - TMDB credentials are present
/// - Timeout and page size are non-zero
/// - Engine channel buffers are non-zero
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if !config.tmdb.has_credentials() {
        return Err(ConfigError::ValidationError(
            "tmdb.api_key or tmdb.bearer_token must be set".to_string(),
        ));
    }

    if config.tmdb.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "tmdb.timeout_secs cannot be 0".to_string(),
        ));
    }

    if config.tmdb.page_size == 0 {
        return Err(ConfigError::ValidationError(
            "tmdb.page_size cannot be 0".to_string(),
        ));
    }

    if config.engine.command_buffer == 0 {
        return Err(ConfigError::ValidationError(
            "engine.command_buffer cannot be 0".to_string(),
        ));
    }

    Ok(())
}
