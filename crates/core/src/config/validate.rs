use reqwest::Url;

use super::{types::Config, ConfigError};
use crate::loader::is_valid_table_name;

/// Validate configuration
/// Currently validates:
/// - Downloader timeout is not 0
/// - At most one of `proxy` and `proxy_chain`
/// - At least one seed URL, every seed an absolute http(s) URL
/// - SQLite table name is a plain identifier
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Downloader validation
    if config.downloader.timeout_secs == 0 {
        return Err(ConfigError::ValidationError(
            "downloader.timeout_secs cannot be 0".to_string(),
        ));
    }
    if config.downloader.proxy.is_some() && !config.downloader.proxy_chain.is_empty() {
        return Err(ConfigError::ValidationError(
            "downloader.proxy and downloader.proxy_chain cannot both be set".to_string(),
        ));
    }

    // Crawl validation
    if config.crawl.seeds.is_empty() {
        return Err(ConfigError::ValidationError(
            "crawl.seeds must contain at least one URL".to_string(),
        ));
    }
    for seed in &config.crawl.seeds {
        let url = Url::parse(seed).map_err(|e| {
            ConfigError::ValidationError(format!("crawl.seeds: invalid URL '{}': {}", seed, e))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "crawl.seeds: unsupported scheme in '{}'",
                seed
            )));
        }
    }

    // Output validation
    if let Some(table) = &config.output.sqlite_table {
        if !is_valid_table_name(table) {
            return Err(ConfigError::ValidationError(format!(
                "output.sqlite_table '{}' is not a valid SQL identifier",
                table
            )));
        }
    }

    Ok(())
}
