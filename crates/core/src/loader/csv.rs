//! CSV file loader.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Mutex;

use super::error::LoaderError;
use super::create_parent_dir;
use super::traits::Loader;
use crate::spider::Item;

struct CsvSink {
    writer: BufWriter<File>,
    header_written: bool,
}

/// Writes items as CSV rows.
///
/// The header comes from the first item's field names. Items must flatten to
/// a single row: nested maps and sequences are rejected.
pub struct CsvLoader {
    name: String,
    path: PathBuf,
    sink: Mutex<Option<CsvSink>>,
}

impl CsvLoader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self {
            name: format!("csv:{}", path.display()),
            path,
            sink: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn encode<I: Item>(item: &I, with_header: bool) -> Result<Vec<u8>, LoaderError> {
        let mut writer = csv::WriterBuilder::new()
            .has_headers(with_header)
            .from_writer(Vec::new());
        writer.serialize(item)?;
        writer
            .into_inner()
            .map_err(|e| LoaderError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl<I: Item> Loader<I> for CsvLoader {
    fn name(&self) -> &str {
        &self.name
    }

    async fn open(&mut self) -> Result<(), LoaderError> {
        create_parent_dir(&self.path).await?;
        let writer = BufWriter::new(File::create(&self.path).await?);
        *self.sink.get_mut() = Some(CsvSink {
            writer,
            header_written: false,
        });
        Ok(())
    }

    async fn dump(&self, item: &I) -> Result<(), LoaderError> {
        let mut guard = self.sink.lock().await;
        let sink = guard
            .as_mut()
            .ok_or_else(|| LoaderError::NotReady(format!("{} is not open", self.name)))?;

        let encoded = Self::encode(item, !sink.header_written)?;
        sink.writer.write_all(&encoded).await?;
        sink.header_written = true;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), LoaderError> {
        if let Some(mut sink) = self.sink.get_mut().take() {
            sink.writer.flush().await?;
        }
        Ok(())
    }
}
