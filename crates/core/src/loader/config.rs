//! Output configuration: which loaders to build.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configured sinks. Any combination may be enabled.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// JSON array output file.
    #[serde(default)]
    pub json: Option<PathBuf>,

    /// Indent items in the JSON output.
    #[serde(default)]
    pub pretty_json: bool,

    /// CSV output file.
    #[serde(default)]
    pub csv: Option<PathBuf>,

    /// SQLite database file.
    #[serde(default)]
    pub sqlite: Option<PathBuf>,

    /// Table for the SQLite loader. Defaults to the item's table.
    #[serde(default)]
    pub sqlite_table: Option<String>,
}

impl OutputConfig {
    /// Whether no sink is configured.
    pub fn is_empty(&self) -> bool {
        self.json.is_none() && self.csv.is_none() && self.sqlite.is_none()
    }
}
