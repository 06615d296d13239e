//! Loaders: pluggable sinks for accepted items, and the lifecycle state
//! machine that drives them.

mod config;
mod csv;
mod error;
mod json;
mod sqlite;
mod state;
mod traits;

pub use self::csv::CsvLoader;
pub use config::OutputConfig;
pub use error::{InvalidStateError, LoaderError};
pub use json::JsonLoader;
pub use sqlite::{is_valid_table_name, SqliteLoader, DEFAULT_TABLE};
pub use state::{CloseOutcome, LoaderState, StatefulLoader};
pub use traits::Loader;

use std::path::Path;

use tracing::debug;

use crate::spider::Item;

/// Creates the directory that will hold `path`, if it has one.
pub(crate) async fn create_parent_dir(path: &Path) -> Result<(), LoaderError> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent).await?;
        }
    }
    Ok(())
}

/// Builds the loaders enabled in `config`.
pub fn create_loaders<I: Item>(config: &OutputConfig) -> Result<Vec<Box<dyn Loader<I>>>, LoaderError> {
    let mut loaders: Vec<Box<dyn Loader<I>>> = Vec::new();

    if let Some(path) = &config.json {
        debug!("Creating JSON loader for {:?}", path);
        loaders.push(Box::new(JsonLoader::new(path).pretty(config.pretty_json)));
    }

    if let Some(path) = &config.csv {
        debug!("Creating CSV loader for {:?}", path);
        loaders.push(Box::new(CsvLoader::new(path)));
    }

    if let Some(path) = &config.sqlite {
        debug!("Creating SQLite loader for {:?}", path);
        let loader = match &config.sqlite_table {
            Some(table) => SqliteLoader::new(path, table.as_str())?,
            None => SqliteLoader::for_item::<I>(path)?,
        };
        loaders.push(Box::new(loader));
    }

    Ok(loaders)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;
    use std::path::PathBuf;

    #[derive(Debug, Serialize)]
    struct Row {
        id: u32,
    }

    impl Item for Row {}

    #[test]
    fn test_create_no_loaders() {
        let config = OutputConfig::default();
        assert!(config.is_empty());
        let loaders = create_loaders::<Row>(&config).unwrap();
        assert!(loaders.is_empty());
    }

    #[test]
    fn test_create_all_loaders() {
        let config = OutputConfig {
            json: Some(PathBuf::from("out.json")),
            pretty_json: true,
            csv: Some(PathBuf::from("out.csv")),
            sqlite: Some(PathBuf::from("out.db")),
            sqlite_table: Some("rows".to_string()),
        };
        let loaders = create_loaders::<Row>(&config).unwrap();
        let names: Vec<_> = loaders.iter().map(|l| l.name().to_string()).collect();
        assert_eq!(names, vec!["json:out.json", "csv:out.csv", "sqlite:out.db:rows"]);
    }

    #[test]
    fn test_invalid_sqlite_table_rejected() {
        let config = OutputConfig {
            sqlite: Some(PathBuf::from("out.db")),
            sqlite_table: Some("rows; --".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            create_loaders::<Row>(&config),
            Err(LoaderError::Configuration(_))
        ));
    }
}
