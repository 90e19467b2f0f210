use crate::{
    error::{ImageGenError, Result},
    models::GeneratedImageRecord,
    storage::traits::RecordStore,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;

pub const RECORD_FORMAT_VERSION: u32 = 1;

#[derive(Serialize, Deserialize)]
struct RecordLine {
    version: u32,
    #[serde(flatten)]
    record: GeneratedImageRecord,
}

/// Append-only record log, one JSON object per line. All access goes
/// through a single async mutex so concurrent appends never interleave.
/// The mutex also holds the number of readable records, seeded on open.
pub struct JsonlRecordStore {
    path: PathBuf,
    count: Mutex<usize>,
}

impl JsonlRecordStore {
    pub async fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.map_err(|e| {
                ImageGenError::Storage(format!(
                    "failed to create record store directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let existing = read_records(&path).await?.len();
        log::info!("📒 Record store at {} ({} records)", path.display(), existing);
        Ok(Self {
            path,
            count: Mutex::new(existing),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

async fn read_records(path: &Path) -> Result<Vec<GeneratedImageRecord>> {
    let raw = match fs::read_to_string(path).await {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(ImageGenError::Storage(format!(
                "failed to read {}: {}",
                path.display(),
                e
            )))
        }
    };

    let mut records = Vec::new();
    for (line_no, line) in raw.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<RecordLine>(line) {
            Ok(entry) if entry.version == RECORD_FORMAT_VERSION => records.push(entry.record),
            Ok(entry) => log::warn!(
                "Skipping record on line {} with unsupported version {}",
                line_no + 1,
                entry.version
            ),
            Err(e) => log::warn!("Skipping unreadable record on line {}: {}", line_no + 1, e),
        }
    }
    Ok(records)
}

#[async_trait]
impl RecordStore for JsonlRecordStore {
    async fn append(&self, record: GeneratedImageRecord) -> Result<()> {
        let line = RecordLine {
            version: RECORD_FORMAT_VERSION,
            record,
        };
        let mut encoded = serde_json::to_string(&line)?;
        encoded.push('\n');

        let mut count = self.count.lock().await;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| {
                ImageGenError::Storage(format!("failed to open {}: {}", self.path.display(), e))
            })?;
        file.write_all(encoded.as_bytes())
            .await
            .map_err(|e| ImageGenError::Storage(format!("failed to append record: {}", e)))?;
        file.flush()
            .await
            .map_err(|e| ImageGenError::Storage(format!("failed to flush record: {}", e)))?;
        *count += 1;

        log::debug!("Appended record {} to {}", line.record.id, self.path.display());
        Ok(())
    }

    async fn list(&self, limit: Option<usize>) -> Result<Vec<GeneratedImageRecord>> {
        let _guard = self.count.lock().await;
        let mut records = read_records(&self.path).await?;
        if let Some(limit) = limit {
            let skip = records.len().saturating_sub(limit);
            records.drain(..skip);
        }
        Ok(records)
    }

    async fn count(&self) -> Result<usize> {
        Ok(*self.count.lock().await)
    }

    async fn health_check(&self) -> Result<bool> {
        let _guard = self.count.lock().await;
        match fs::metadata(&self.path).await {
            Ok(meta) => Ok(meta.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let parent = self
                    .path
                    .parent()
                    .filter(|p| !p.as_os_str().is_empty())
                    .unwrap_or_else(|| Path::new("."));
                Ok(fs::metadata(parent).await.map(|m| m.is_dir()).unwrap_or(false))
            }
            Err(e) => Err(ImageGenError::Storage(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    async fn store_in(dir: &tempfile::TempDir) -> JsonlRecordStore {
        JsonlRecordStore::new(dir.path().join("records").join("image_records.jsonl"))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;

        assert_eq!(store.count().await.unwrap(), 0);
        assert!(store.list(None).await.unwrap().is_empty());
        assert!(store.health_check().await.unwrap());
    }

    #[tokio::test]
    async fn test_append_preserves_order() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;

        for i in 1..=3 {
            let record = GeneratedImageRecord::new(
                "req-1",
                "a red bicycle",
                format!("out/img{}.png", i),
                format!("https://img.example/{}", i),
            );
            store.append(record).await.unwrap();
        }

        let records = store.list(None).await.unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].filename, "out/img1.png");
        assert_eq!(records[2].source_url, "https://img.example/3");

        let recent = store.list(Some(2)).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[0].filename, "out/img2.png");
        assert_eq!(recent[1].filename, "out/img3.png");
    }

    #[tokio::test]
    async fn test_lines_are_versioned_json() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        store
            .append(GeneratedImageRecord::new("req", "prompt", "a.png", "https://x"))
            .await
            .unwrap();

        let raw = std::fs::read_to_string(store.path()).unwrap();
        let value: serde_json::Value = serde_json::from_str(raw.trim()).unwrap();
        assert_eq!(value["version"], 1);
        assert_eq!(value["prompt"], "prompt");
        assert_eq!(value["filename"], "a.png");
    }

    #[tokio::test]
    async fn test_skips_bad_lines() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir).await;
        store
            .append(GeneratedImageRecord::new("req", "first", "a.png", "https://x"))
            .await
            .unwrap();

        let mut raw = std::fs::read_to_string(store.path()).unwrap();
        let future_version = raw
            .lines()
            .next()
            .unwrap()
            .replace("\"version\":1", "\"version\":99");
        raw.push_str("garbage line\n");
        raw.push_str(&future_version);
        raw.push('\n');
        std::fs::write(store.path(), raw).unwrap();

        let records = store.list(None).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].prompt, "first");
    }

    #[tokio::test]
    async fn test_concurrent_appends_are_not_lost() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir).await);

        let mut handles = Vec::new();
        for i in 0..20 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .append(GeneratedImageRecord::new(
                        format!("req-{}", i),
                        "same prompt",
                        "shared.png",
                        "https://x",
                    ))
                    .await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.count().await.unwrap(), 20);
    }

    #[tokio::test]
    async fn test_count_is_seeded_from_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = store_in(&dir).await;
            for prompt in ["first", "second"] {
                store
                    .append(GeneratedImageRecord::new("req", prompt, "a.png", "https://x"))
                    .await
                    .unwrap();
            }
        }

        let mut raw = std::fs::read_to_string(dir.path().join("records/image_records.jsonl")).unwrap();
        raw.push_str("garbage line\n");
        std::fs::write(dir.path().join("records/image_records.jsonl"), raw).unwrap();

        let reopened = store_in(&dir).await;
        assert_eq!(reopened.count().await.unwrap(), 2);

        reopened
            .append(GeneratedImageRecord::new("req", "third", "a.png", "https://x"))
            .await
            .unwrap();
        assert_eq!(reopened.count().await.unwrap(), 3);
        assert_eq!(reopened.list(None).await.unwrap().len(), 3);
    }
}
