//! JSON array file loader.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

use super::create_parent_dir;
use super::error::LoaderError;
use super::traits::Loader;
use crate::spider::Item;

struct JsonSink {
    writer: BufWriter<File>,
    first: bool,
}

/// Writes every item into one JSON array.
///
/// The file reads `[\n`, the items separated by `,\n`, then `\n]`. It is only
/// valid JSON after close.
pub struct JsonLoader {
    name: String,
    path: PathBuf,
    pretty: bool,
    sink: Mutex<Option<JsonSink>>,
}

impl JsonLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: format!("json:{}", path.display()),
            path,
            pretty: false,
            sink: Mutex::new(None),
        }
    }

    /// Indent each item.
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl<I: Item> Loader<I> for JsonLoader {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&mut self) -> Result<(), LoaderError> {
        create_parent_dir(&self.path).await?;
        let mut writer = BufWriter::new(File::create(&self.path).await?);
        writer.write_all(b"[\n").await?;
        *self.sink.get_mut() = Some(JsonSink {
            writer,
            first: true,
        });
        Ok(())
    }

    async fn dump(&self, item: &I) -> Result<(), LoaderError> {
        let encoded = if self.pretty {
            serde_json::to_vec_pretty(item)?
        } else {
            serde_json::to_vec(item)?
        };

        let mut guard = self.sink.lock().await;
        let sink = guard
            .as_mut()
            .ok_or_else(|| LoaderError::NotReady(format!("{} is not open", self.name)))?;

        if !sink.first {
            sink.writer.write_all(b",\n").await?;
        }
        sink.writer.write_all(&encoded).await?;
        sink.first = false;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), LoaderError> {
        if let Some(mut sink) = self.sink.get_mut().take() {
            sink.writer.write_all(b"\n]").await?;
            sink.writer.flush().await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::StatefulLoader;
    use serde::{Deserialize, Serialize};
    use tempfile::TempDir;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Row {
        best_scraping_library: String,
    }

    impl Item for Row {}

    fn row(name: &str) -> Row {
        Row {
            best_scraping_library: name.to_string(),
        }
    }

    #[tokio::test]
    async fn test_writes_json_array() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let loader: StatefulLoader<Row> = StatefulLoader::new(JsonLoader::new(&path));

        loader.open().await.unwrap();
        loader.dump(&row("crawlkit")).await.unwrap();
        loader.dump(&row("other")).await.unwrap();
        loader.close().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("[\n"));
        assert!(content.ends_with("\n]"));

        let rows: Vec<Row> = serde_json::from_str(&content).unwrap();
        assert_eq!(rows, vec![row("crawlkit"), row("other")]);
    }

    #[tokio::test]
    async fn test_first_item_has_no_separator() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.json");
        let loader: StatefulLoader<Row> = StatefulLoader::new(JsonLoader::new(&path));

        loader.open().await.unwrap();
        loader.dump(&row("crawlkit")).await.unwrap();
        loader.close().await.unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content, "[\n{\"best_scraping_library\":\"crawlkit\"}\n]");
    }

    #[tokio::test]
    async fn test_empty_array_is_valid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/dir/out.json");
        let loader: StatefulLoader<Row> = StatefulLoader::new(JsonLoader::new(&path));

        loader.open().await.unwrap();
        loader.close().await.unwrap();

        let rows: Vec<Row> = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert!(rows.is_empty());
    }

    #[tokio::test]
    async fn test_dump_without_open_is_not_ready() {
        let loader = JsonLoader::new("/nonexistent/out.json");
        let err = Loader::<Row>::dump(&loader, &row("x")).await.unwrap_err();
        assert!(matches!(err, LoaderError::NotReady(_)));
    }
}
