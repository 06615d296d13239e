use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use std::path::Path;

use super::{types::Config, ConfigError};

/// Load configuration from file with environment variable overrides
///
/// Variables look like `CRAWLKIT_DOWNLOADER__TIMEOUT_SECS`: nested keys are
/// separated by a double underscore, since field names contain single ones.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.display().to_string()));
    }

    let config: Config = Figment::new()
        .merge(Toml::file(path))
        .merge(Env::prefixed("CRAWLKIT_").split("__"))
        .extract()
        .map_err(|e| ConfigError::ParseError(e.to_string()))?;

    Ok(config)
}

/// Load configuration from TOML string (useful for testing)
pub fn load_config_from_str(toml_str: &str) -> Result<Config, ConfigError> {
    toml::from_str(toml_str).map_err(|e| ConfigError::ParseError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_config_from_str_valid() {
        let toml = r#"
[crawl]
seeds = ["https://example.com"]

[downloader]
timeout_secs = 9
"#;
        let config = load_config_from_str(toml).unwrap();
        assert_eq!(config.downloader.timeout_secs, 9);
        assert_eq!(config.crawl.seeds.len(), 1);
    }

    #[test]
    fn test_load_config_from_str_wrong_type() {
        let toml = r#"
[downloader]
timeout_secs = "soon"
"#;
        let result = load_config_from_str(toml);
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::ParseError(_)));
    }

    #[test]
    fn test_load_config_file_not_found() {
        let result = load_config(Path::new("/nonexistent/crawlkit.toml"));
        assert!(result.is_err());
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn test_load_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[crawl]
seeds = ["https://example.com", "https://example.org"]
follow_links = true

[output]
csv = "items.csv"
"#
        )
        .unwrap();

        let config = load_config(temp_file.path()).unwrap();
        assert_eq!(config.crawl.seeds.len(), 2);
        assert!(config.crawl.follow_links);
        assert_eq!(
            config.output.csv.as_deref(),
            Some(Path::new("items.csv"))
        );
    }

    #[test]
    fn test_env_overrides_nested_keys() {
        let mut temp_file = NamedTempFile::new().unwrap();
        writeln!(
            temp_file,
            r#"
[engine]
loop_delay_ms = 10
"#
        )
        .unwrap();

        std::env::set_var("CRAWLKIT_ENGINE__LOOP_DELAY_MS", "250");
        let config = load_config(temp_file.path());
        std::env::remove_var("CRAWLKIT_ENGINE__LOOP_DELAY_MS");

        assert_eq!(config.unwrap().engine.loop_delay_ms, 250);
    }
}
