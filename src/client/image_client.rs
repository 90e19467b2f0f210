use crate::{
    client::traits::ImageGenerator,
    error::{ImageGenError, Result},
    models::{
        ImageSource, OpenAiErrorResponse, OpenAiImageRequest, OpenAiImageResponse,
        ResolvedGeneration,
    },
};
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};
use std::time::Duration;

#[derive(Clone)]
pub struct ImageClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl ImageClient {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
            base_url: base_url.into(),
        }
    }

    pub fn generations_url(&self) -> String {
        format!("{}/images/generations", self.base_url.trim_end_matches('/'))
    }
}

/// Builds an upstream error from a non-success response, keeping the
/// provider's message for the server log.
pub(crate) fn upstream_error(status: u16, body: &str) -> ImageGenError {
    match serde_json::from_str::<OpenAiErrorResponse>(body) {
        Ok(parsed) => {
            let kind = parsed
                .error
                .code
                .or(parsed.error.kind)
                .unwrap_or_else(|| "unknown".to_string());
            ImageGenError::Upstream(format!("{} ({}): {}", status, kind, parsed.error.message))
        }
        Err(_) => ImageGenError::Upstream(format!("{}: {}", status, body.trim())),
    }
}

pub(crate) fn parse_images(response: OpenAiImageResponse) -> Result<Vec<ImageSource>> {
    if response.data.is_empty() {
        return Err(ImageGenError::Upstream("No images generated".into()));
    }

    response
        .data
        .into_iter()
        .map(|item| {
            if let Some(revised) = &item.revised_prompt {
                log::debug!("Provider revised prompt to: {}", revised);
            }
            match (item.url, item.b64_json) {
                (Some(url), _) => Ok(ImageSource::Url(url)),
                (None, Some(b64)) => STANDARD
                    .decode(b64.as_bytes())
                    .map(ImageSource::Inline)
                    .map_err(|e| ImageGenError::Upstream(format!("invalid base64 image: {}", e))),
                (None, None) => Err(ImageGenError::Upstream(
                    "image entry carried neither url nor b64_json".into(),
                )),
            }
        })
        .collect()
}

#[async_trait]
impl ImageGenerator for ImageClient {
    async fn generate(
        &self,
        request: &ResolvedGeneration,
        timeout: Duration,
    ) -> Result<Vec<ImageSource>> {
        let payload = OpenAiImageRequest {
            model: &request.model,
            prompt: &request.prompt,
            n: request.n,
            size: &request.size,
            quality: Some(request.quality.as_str()).filter(|q| !q.is_empty()),
        };

        log::info!(
            "🎨 Generating {} image(s) with model: {} ({})",
            request.n,
            request.model,
            request.size
        );

        let response = self
            .http
            .post(self.generations_url())
            .bearer_auth(&self.api_key)
            .timeout(timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ImageGenError::Upstream(format!("generation timed out after {:?}", timeout))
                } else {
                    ImageGenError::Upstream(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(upstream_error(status.as_u16(), &body));
        }

        let parsed: OpenAiImageResponse = response
            .json()
            .await
            .map_err(|e| ImageGenError::Upstream(format!("unreadable response: {}", e)))?;

        parse_images(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::stub::serve_once;

    fn response(raw: &str) -> OpenAiImageResponse {
        serde_json::from_str(raw).unwrap()
    }

    #[test]
    fn test_generations_url() {
        let client = ImageClient::new(reqwest::Client::new(), "sk", "https://api.openai.com/v1/");
        assert_eq!(
            client.generations_url(),
            "https://api.openai.com/v1/images/generations"
        );
    }

    #[test]
    fn test_parse_url_images() {
        let images = parse_images(response(
            r#"{"created": 1, "data": [{"url": "https://a/1.png"}, {"url": "https://a/2.png"}]}"#,
        ))
        .unwrap();
        assert_eq!(
            images,
            vec![
                ImageSource::Url("https://a/1.png".into()),
                ImageSource::Url("https://a/2.png".into())
            ]
        );
    }

    #[test]
    fn test_parse_inline_image() {
        let encoded = STANDARD.encode(b"\x89PNG");
        let raw = format!(r#"{{"data": [{{"b64_json": "{}"}}]}}"#, encoded);
        let images = parse_images(response(&raw)).unwrap();
        assert_eq!(images, vec![ImageSource::Inline(b"\x89PNG".to_vec())]);
    }

    #[test]
    fn test_parse_empty_is_upstream_error() {
        let err = parse_images(response(r#"{"data": []}"#)).unwrap_err();
        assert!(matches!(err, ImageGenError::Upstream(_)));

        let err = parse_images(response(r#"{"data": [{"revised_prompt": "x"}]}"#)).unwrap_err();
        assert!(matches!(err, ImageGenError::Upstream(_)));
    }

    #[test]
    fn test_upstream_error_keeps_provider_message() {
        let err = upstream_error(
            400,
            r#"{"error": {"message": "Your request was rejected", "type": "invalid_request_error", "code": "content_policy_violation"}}"#,
        );
        let text = err.to_string();
        assert!(text.contains("content_policy_violation"));
        assert!(text.contains("Your request was rejected"));

        let err = upstream_error(502, "Bad Gateway");
        assert_eq!(err.to_string(), "Upstream API error: 502: Bad Gateway");
    }

    fn resolved(quality: &str) -> ResolvedGeneration {
        ResolvedGeneration {
            original_prompt: "a red bicycle".into(),
            prompt: "a red bicycle, in watercolor style".into(),
            model: "dall-e-2".into(),
            size: "512x512".into(),
            n: 2,
            quality: quality.into(),
        }
    }

    fn client_for(base: &str) -> ImageClient {
        ImageClient::new(reqwest::Client::new(), "sk-test", format!("{}/v1", base))
    }

    #[tokio::test]
    async fn test_generate_sends_request_and_parses_urls() {
        let (base, server) = serve_once(
            "200 OK",
            br#"{"created": 1, "data": [{"url": "https://img/1.png"}, {"url": "https://img/2.png"}]}"#
                .to_vec(),
            Duration::ZERO,
        )
        .await;

        let images = client_for(&base)
            .generate(&resolved("hd"), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(
            images,
            vec![
                ImageSource::Url("https://img/1.png".into()),
                ImageSource::Url("https://img/2.png".into())
            ]
        );

        let captured = server.await.unwrap();
        assert!(captured.head.starts_with("post /v1/images/generations http/1.1"));
        assert!(captured.head.contains("authorization: bearer sk-test"));
        assert!(captured.head.contains("content-type: application/json"));

        let body: serde_json::Value = serde_json::from_str(&captured.body).unwrap();
        assert_eq!(
            body,
            serde_json::json!({
                "model": "dall-e-2",
                "prompt": "a red bicycle, in watercolor style",
                "n": 2,
                "size": "512x512",
                "quality": "hd"
            })
        );
    }

    #[tokio::test]
    async fn test_generate_omits_empty_quality() {
        let (base, server) = serve_once(
            "200 OK",
            br#"{"data": [{"url": "https://img/1.png"}]}"#.to_vec(),
            Duration::ZERO,
        )
        .await;

        client_for(&base)
            .generate(&resolved(""), Duration::from_secs(5))
            .await
            .unwrap();

        let body: serde_json::Value =
            serde_json::from_str(&server.await.unwrap().body).unwrap();
        assert!(body.get("quality").is_none());
    }

    #[tokio::test]
    async fn test_generate_client_error_is_upstream() {
        let (base, _server) = serve_once(
            "400 Bad Request",
            br#"{"error": {"message": "Billing hard limit has been reached", "type": "invalid_request_error", "code": "billing_hard_limit_reached"}}"#
                .to_vec(),
            Duration::ZERO,
        )
        .await;

        let err = client_for(&base)
            .generate(&resolved("standard"), Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            ImageGenError::Upstream(msg) => {
                assert!(msg.starts_with("400 (billing_hard_limit_reached)"));
                assert!(msg.contains("Billing hard limit"));
            }
            other => panic!("expected upstream error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_generate_server_error_is_upstream() {
        let (base, _server) = serve_once(
            "503 Service Unavailable",
            b"overloaded".to_vec(),
            Duration::ZERO,
        )
        .await;

        let err = client_for(&base)
            .generate(&resolved("standard"), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Upstream API error: 503: overloaded");
    }

    #[tokio::test]
    async fn test_generate_timeout_is_upstream() {
        let (base, server) = serve_once(
            "200 OK",
            br#"{"data": [{"url": "https://img/1.png"}]}"#.to_vec(),
            Duration::from_secs(5),
        )
        .await;

        let err = client_for(&base)
            .generate(&resolved("standard"), Duration::from_millis(200))
            .await
            .unwrap_err();
        match err {
            ImageGenError::Upstream(msg) => assert!(msg.contains("timed out")),
            other => panic!("expected upstream error, got {:?}", other),
        }
        server.abort();
    }
}
