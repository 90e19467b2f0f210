pub mod download_client;
pub mod image_client;
pub mod traits;

use crate::{
    config::OpenAiConfig,
    error::{ImageGenError, Result},
};
use std::sync::Arc;

pub use download_client::DownloadClient;
pub use image_client::ImageClient;
pub use traits::{ImageDownloader, ImageGenerator};

/// The outbound HTTP collaborators, sharing one connection pool.
#[derive(Clone)]
pub struct OpenAiClient {
    image_client: ImageClient,
    download_client: DownloadClient,
}

impl OpenAiClient {
    pub fn new(config: &OpenAiConfig) -> Result<Self> {
        let api_key = config.require_api_key()?;

        let http = reqwest::Client::builder()
            .user_agent(concat!("imagegen-server/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ImageGenError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            image_client: ImageClient::new(http.clone(), api_key, config.base_url.clone()),
            download_client: DownloadClient::new(http),
        })
    }

    pub fn image(&self) -> &ImageClient {
        &self.image_client
    }

    pub fn generator_handle(&self) -> Arc<dyn ImageGenerator> {
        Arc::new(self.image_client.clone())
    }

    pub fn downloader_handle(&self) -> Arc<dyn ImageDownloader> {
        Arc::new(self.download_client.clone())
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_requires_api_key() {
        assert!(OpenAiClient::new(&OpenAiConfig::new()).is_err());
        let client = OpenAiClient::new(
            &OpenAiConfig::new()
                .with_api_key("sk-test")
                .with_base_url("http://localhost:9999/v1"),
        )
        .unwrap();
        assert_eq!(
            client.image().generations_url(),
            "http://localhost:9999/v1/images/generations"
        );
    }
}
