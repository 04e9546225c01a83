//! Local implementations of the artifact store and result sink seams.

use async_trait::async_trait;
use squall_common::job::ResultRecord;
use squall_engine::diagnostics::{ArtifactStore, ResultSink};
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// Key-value store backed by a directory, one file per key.
pub struct LocalKeyValueStore {
    root: PathBuf,
}

impl LocalKeyValueStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn file_name(key: &str, content_type: &str) -> String {
        let ext = match content_type {
            "text/html" => "html",
            "image/png" => "png",
            "video/webm" => "webm",
            "application/json" => "json",
            _ => "bin",
        };
        format!("{key}.{ext}")
    }
}

#[async_trait]
impl ArtifactStore for LocalKeyValueStore {
    async fn put(&mut self, key: &str, bytes: &[u8], content_type: &str) -> std::io::Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.root.join(Self::file_name(key, content_type));
        tokio::fs::write(&path, bytes).await?;
        tracing::info!(key, path = %path.display(), "stored artifact");
        Ok(())
    }
}

/// Dataset sink appending one JSON line per record.
pub struct LocalDataset {
    path: PathBuf,
}

impl LocalDataset {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl ResultSink for LocalDataset {
    async fn push(&mut self, record: &ResultRecord) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let mut line = serde_json::to_string(record).map_err(std::io::Error::other)?;
        line.push('\n');
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use squall_common::job::JobStatus;

    #[tokio::test]
    async fn artifacts_land_with_content_type_extension() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = LocalKeyValueStore::new(dir.path().join("key_value"));

        store
            .put("TIMEOUT_DUMP_HTML", b"<html></html>", "text/html")
            .await
            .unwrap();
        store
            .put("TIMEOUT_DUMP_SCREENSHOT", &[0x89, b'P'], "image/png")
            .await
            .unwrap();

        assert!(dir.path().join("key_value/TIMEOUT_DUMP_HTML.html").exists());
        assert!(
            dir.path()
                .join("key_value/TIMEOUT_DUMP_SCREENSHOT.png")
                .exists()
        );
    }

    #[tokio::test]
    async fn dataset_appends_one_line_per_record() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("storage/dataset.jsonl");
        let mut sink = LocalDataset::new(&path);

        sink.push(&ResultRecord::success("addr one", "115 Vmph".into()))
            .await
            .unwrap();
        sink.push(&ResultRecord::failed("addr two", "Vmph not found.".into()))
            .await
            .unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: ResultRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first.status, JobStatus::Success);
        assert_eq!(first.wind_speed.as_deref(), Some("115 Vmph"));

        let second: ResultRecord = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second.status, JobStatus::Failed);
        assert_eq!(second.error.as_deref(), Some("Vmph not found."));
    }
}
