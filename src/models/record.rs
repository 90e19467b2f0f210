use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One saved image. Written once, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneratedImageRecord {
    pub id: String,
    pub request_id: String,
    pub prompt: String,
    pub filename: String,
    pub source_url: String,
    pub created_at: DateTime<Utc>,
}

impl GeneratedImageRecord {
    pub fn new(
        request_id: impl Into<String>,
        prompt: impl Into<String>,
        filename: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            request_id: request_id.into(),
            prompt: prompt.into(),
            filename: filename.into(),
            source_url: source_url.into(),
            created_at: Utc::now(),
        }
    }
}
