use crate::error::{ImageGenError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// How output filenames are derived from the configured base name.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilenameStrategy {
    /// `<base><index>.png`. Collides across requests.
    Indexed,
    /// `<base>_<request id>_<index>.png`.
    #[default]
    Unique,
    /// `<base>.png` for every image of every request. Legacy behaviour.
    Fixed,
}

impl FilenameStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilenameStrategy::Indexed => "indexed",
            FilenameStrategy::Unique => "unique",
            FilenameStrategy::Fixed => "fixed",
        }
    }

    pub fn overwrites_across_requests(&self) -> bool {
        !matches!(self, FilenameStrategy::Unique)
    }
}

#[derive(Debug, Clone)]
pub struct ImageWriter {
    output_dir: PathBuf,
    filename_base: String,
    strategy: FilenameStrategy,
}

impl ImageWriter {
    pub fn new(
        output_dir: impl Into<PathBuf>,
        filename_base: impl Into<String>,
        strategy: FilenameStrategy,
    ) -> Self {
        Self {
            output_dir: output_dir.into(),
            filename_base: filename_base.into(),
            strategy,
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// `index` is 1-based.
    pub fn path_for(&self, request_id: &str, index: usize) -> PathBuf {
        let name = match self.strategy {
            FilenameStrategy::Indexed => format!("{}{}.png", self.filename_base, index),
            FilenameStrategy::Unique => {
                format!("{}_{}_{}.png", self.filename_base, request_id, index)
            }
            FilenameStrategy::Fixed => format!("{}.png", self.filename_base),
        };
        self.output_dir.join(name)
    }

    pub async fn ensure_output_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.output_dir).await.map_err(|e| {
            ImageGenError::Storage(format!(
                "failed to create output directory {}: {}",
                self.output_dir.display(),
                e
            ))
        })
    }

    /// Writes through a temporary sibling and renames it into place, so a
    /// reader never observes a half-written image. Each write gets its own
    /// temporary name; concurrent writers to one path end last-writer-wins.
    pub async fn write(&self, path: &Path, bytes: &[u8]) -> Result<()> {
        self.ensure_output_dir().await?;

        let mut tmp_name = path.as_os_str().to_owned();
        tmp_name.push(format!(".{}.tmp", Uuid::new_v4().simple()));
        let tmp_path = PathBuf::from(tmp_name);

        fs::write(&tmp_path, bytes).await?;
        if let Err(e) = fs::rename(&tmp_path, path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e.into());
        }

        log::info!("💾 Image saved as {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }
}
