use crate::{
    client::traits::ImageDownloader,
    error::{ImageGenError, Result},
};
use async_trait::async_trait;
use std::time::Duration;

#[derive(Clone)]
pub struct DownloadClient {
    http: reqwest::Client,
}

impl DownloadClient {
    pub fn new(http: reqwest::Client) -> Self {
        Self { http }
    }
}

#[async_trait]
impl ImageDownloader for DownloadClient {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<Vec<u8>> {
        log::debug!("Downloading image from {}", url);

        let response = self
            .http
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| ImageGenError::Download(format!("{}: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ImageGenError::Download(format!(
                "{} returned status {}",
                url, status
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ImageGenError::Download(format!("{}: {}", url, e)))?;

        if bytes.is_empty() {
            return Err(ImageGenError::Download(format!("{} returned an empty body", url)));
        }

        Ok(bytes.to_vec())
    }
}
