pub mod client;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod rate_limiter;
pub mod server;
pub mod service;
pub mod storage;

pub use client::{DownloadClient, ImageClient, ImageDownloader, ImageGenerator, OpenAiClient};
pub use config::{AppConfig, GenerationDefaults, OpenAiConfig, ServerConfig, StorageConfig};
pub use error::{ImageGenError, Result};
pub use models::*;
pub use rate_limiter::RateLimiter;
pub use service::{augment_prompt, ImageGenerationService};
pub use storage::{FilenameStrategy, ImageWriter, JsonlRecordStore, RecordStore};
