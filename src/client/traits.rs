use crate::{
    error::Result,
    models::{ImageSource, ResolvedGeneration},
};
use async_trait::async_trait;
use std::time::Duration;

/// A text-to-image provider.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Returns one source per generated image. Failures are
    /// `ImageGenError::Upstream`.
    async fn generate(
        &self,
        request: &ResolvedGeneration,
        timeout: Duration,
    ) -> Result<Vec<ImageSource>>;
}

/// Fetches a generated image. Failures are `ImageGenError::Download`.
#[async_trait]
pub trait ImageDownloader: Send + Sync {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>>;
}
