use std::path::Path;

use figment::{
    providers::{Env, Format, Toml},
    Figment,
};

use super::{types::Config, ConfigError};

/// Prefix of environment variables that override file values.
const ENV_PREFIX: &str = "CINELIST_";

/// Separator between nesting levels in an override name, so
/// `CINELIST_TMDB__PAGE_SIZE` sets `tmdb.page_size`.
const ENV_NESTING: &str = "__";

/// Load the TOML file at `path`, then apply `CINELIST_*` overrides.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split(ENV_NESTING))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))
}

/// Parse a TOML string without environment overrides.
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{SortDirection, SortKey};
    use figment::Jail;

    const MINIMAL: &str = r#"
[tmdb]
api_key = "key"
base_url = "http://127.0.0.1:9000/3"

[database]
path = "/data/prefs.db"
"#;

    #[test]
    fn test_load_config_from_str_defaults() {
        let toml = r#"
[tmdb]
bearer_token = "abc"
page_size = 10
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.tmdb.page_size, 10);
        assert_eq!(config.tmdb.bearer_token.as_deref(), Some("abc"));
        assert_eq!(config.database.path.to_str(), Some("cinelist.db"));
        assert_eq!(config.engine.guard_window_ms, 1000);
        assert_eq!(config.engine.default_sort_key, SortKey::Popularity);
        assert_eq!(config.engine.default_direction, SortDirection::Desc);
    }

    #[test]
    fn test_load_config_from_str_missing_tmdb() {
        let toml = r#"
[engine]
guard_window_ms = 500
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_unknown_sort_key_rejected() {
        let toml = r#"
[tmdb]
api_key = "key"

[engine]
default_sort_key = "budget"
"#;
        let result = load_config_from_str(toml);
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/cinelist.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_config_from_file() {
        Jail::expect_with(|jail| {
            jail.create_file("cinelist.toml", MINIMAL)?;

            let config = load_config(Path::new("cinelist.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.tmdb.api_key.as_deref(), Some("key"));
            assert_eq!(config.tmdb.base_url, "http://127.0.0.1:9000/3");
            assert_eq!(config.database.path.to_str(), Some("/data/prefs.db"));
            Ok(())
        });
    }

    #[test]
    fn test_nested_env_overrides_file() {
        Jail::expect_with(|jail| {
            jail.create_file("cinelist.toml", MINIMAL)?;
            jail.set_env("CINELIST_TMDB__PAGE_SIZE", "5");
            jail.set_env("CINELIST_TMDB__BEARER_TOKEN", "from-env");
            jail.set_env("CINELIST_ENGINE__GUARD_WINDOW_MS", "250");
            jail.set_env("CINELIST_ENGINE__DEFAULT_SORT_KEY", "vote_count");
            jail.set_env("CINELIST_DATABASE__PATH", "/tmp/override.db");

            let config = load_config(Path::new("cinelist.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.tmdb.page_size, 5);
            assert_eq!(config.tmdb.bearer_token.as_deref(), Some("from-env"));
            assert_eq!(config.tmdb.api_key.as_deref(), Some("key"));
            assert_eq!(config.engine.guard_window_ms, 250);
            assert_eq!(config.engine.default_sort_key, SortKey::VoteCount);
            assert_eq!(config.database.path.to_str(), Some("/tmp/override.db"));
            Ok(())
        });
    }

    #[test]
    fn test_binary_env_vars_are_not_config_keys() {
        Jail::expect_with(|jail| {
            jail.create_file("cinelist.toml", MINIMAL)?;
            jail.set_env("CINELIST_CONFIG", "cinelist.toml");
            jail.set_env("CINELIST_LOG_FORMAT", "json");

            let config = load_config(Path::new("cinelist.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.tmdb.page_size, 20);
            Ok(())
        });
    }

    #[test]
    fn test_single_underscore_does_not_nest() {
        Jail::expect_with(|jail| {
            jail.create_file("cinelist.toml", MINIMAL)?;
            jail.set_env("CINELIST_TMDB_PAGE_SIZE", "3");

            let config = load_config(Path::new("cinelist.toml")).map_err(|e| e.to_string())?;
            assert_eq!(config.tmdb.page_size, 20);
            Ok(())
        });
    }
}
