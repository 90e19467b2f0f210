use crate::{error::Result, models::GeneratedImageRecord};
use async_trait::async_trait;

#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Appends one record. Existing records are never rewritten.
    async fn append(&self, record: GeneratedImageRecord) -> Result<()>;

    /// Records in insertion order. With a limit, only the most recent
    /// `limit` records are returned, still oldest first.
    async fn list(&self, limit: Option<usize>) -> Result<Vec<GeneratedImageRecord>>;

    async fn count(&self) -> Result<usize>;

    async fn health_check(&self) -> Result<bool>;
}
