use crate::{
    client::{ImageDownloader, ImageGenerator, OpenAiClient},
    config::{AppConfig, GenerationDefaults},
    error::{ImageGenError, Result, PROMPT_REQUIRED},
    logger,
    models::{GeneratedImageRecord, GenerationRequest, ImageSource, ResolvedGeneration},
    storage::{ImageWriter, RecordStore},
};
use std::sync::Arc;

/// Appends the style clause used when a style is requested or configured.
pub fn augment_prompt(prompt: &str, style: Option<&str>) -> String {
    match style.map(str::trim).filter(|s| !s.is_empty()) {
        Some(style) => format!("{}, in {} style", prompt, style),
        None => prompt.to_string(),
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Handles one generation end to end: validate, generate, download every
/// image, then write each file and append its record.
pub struct ImageGenerationService {
    generator: Arc<dyn ImageGenerator>,
    downloader: Arc<dyn ImageDownloader>,
    writer: ImageWriter,
    records: Arc<dyn RecordStore>,
    defaults: GenerationDefaults,
}

impl ImageGenerationService {
    pub fn new(
        generator: Arc<dyn ImageGenerator>,
        downloader: Arc<dyn ImageDownloader>,
        writer: ImageWriter,
        records: Arc<dyn RecordStore>,
        defaults: GenerationDefaults,
    ) -> Self {
        Self {
            generator,
            downloader,
            writer,
            records,
            defaults,
        }
    }

    pub fn from_config(
        config: &AppConfig,
        client: &OpenAiClient,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        let writer = ImageWriter::new(
            config.storage.output_dir.clone(),
            config.generation.filename_base.clone(),
            config.generation.filename_strategy,
        );
        Self::new(
            client.generator_handle(),
            client.downloader_handle(),
            writer,
            records,
            config.generation.clone(),
        )
    }

    pub fn records(&self) -> &Arc<dyn RecordStore> {
        &self.records
    }

    pub fn writer(&self) -> &ImageWriter {
        &self.writer
    }

    pub fn resolve(&self, request: GenerationRequest) -> Result<ResolvedGeneration> {
        let original_prompt = non_empty(request.prompt)
            .ok_or_else(|| ImageGenError::Validation(PROMPT_REQUIRED.into()))?;

        if original_prompt.chars().count() > self.defaults.max_prompt_chars {
            return Err(ImageGenError::Validation(format!(
                "Prompt must be at most {} characters",
                self.defaults.max_prompt_chars
            )));
        }

        let n = request.n.unwrap_or(1);
        if n == 0 || n > self.defaults.max_images {
            return Err(ImageGenError::Validation(format!(
                "n must be between 1 and {}",
                self.defaults.max_images
            )));
        }

        let style = non_empty(request.style).or_else(|| non_empty(self.defaults.style.clone()));
        let prompt = augment_prompt(&original_prompt, style.as_deref());

        Ok(ResolvedGeneration {
            original_prompt,
            prompt,
            model: non_empty(request.model).unwrap_or_else(|| self.defaults.default_model.clone()),
            size: non_empty(request.size).unwrap_or_else(|| self.defaults.image_size.clone()),
            n,
            quality: non_empty(request.quality).unwrap_or_else(|| self.defaults.quality.clone()),
        })
    }

    /// Returns the saved file paths, in the order the provider returned
    /// the images.
    pub async fn generate(&self, request: GenerationRequest, request_id: &str) -> Result<Vec<String>> {
        let resolved = self.resolve(request)?;
        let timeout = self.defaults.timeout();
        let _timer = logger::timer(&format!("generation {}", request_id));

        let sources = self.generator.generate(&resolved, timeout).await?;
        if sources.len() != resolved.n as usize {
            log::warn!(
                "[{}] Requested {} image(s), provider returned {}",
                request_id,
                resolved.n,
                sources.len()
            );
        }

        // Nothing touches the disk until every image is in hand.
        let mut payloads = Vec::with_capacity(sources.len());
        for source in sources {
            let source_url = source.describe().to_string();
            let bytes = match source {
                ImageSource::Url(url) => self.downloader.fetch(&url, timeout).await?,
                ImageSource::Inline(bytes) => bytes,
            };
            payloads.push((source_url, bytes));
        }

        let mut saved = Vec::with_capacity(payloads.len());
        for (index, (source_url, bytes)) in payloads.into_iter().enumerate() {
            let path = self.writer.path_for(request_id, index + 1);
            self.writer.write(&path, &bytes).await?;

            let filename = path.to_string_lossy().into_owned();
            self.records
                .append(GeneratedImageRecord::new(
                    request_id,
                    resolved.prompt.clone(),
                    filename.clone(),
                    source_url,
                ))
                .await?;
            saved.push(filename);
        }

        log::info!(
            "[{}] ✅ Saved {} image(s) for prompt {:?}",
            request_id,
            saved.len(),
            resolved.original_prompt
        );
        Ok(saved)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Generator returning `count` URLs (or a canned failure) and keeping
    /// every request it saw.
    pub struct FakeGenerator {
        pub calls: Mutex<Vec<ResolvedGeneration>>,
        pub fail_with: Option<String>,
        pub inline: bool,
    }

    impl FakeGenerator {
        pub fn ok() -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                fail_with: None,
                inline: false,
            }
        }

        pub fn failing(message: &str) -> Self {
            Self {
                fail_with: Some(message.to_string()),
                ..Self::ok()
            }
        }

        pub fn inline() -> Self {
            Self {
                inline: true,
                ..Self::ok()
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn last_prompt(&self) -> Option<String> {
            self.calls.lock().unwrap().last().map(|c| c.prompt.clone())
        }
    }

    #[async_trait]
    impl ImageGenerator for FakeGenerator {
        async fn generate(
            &self,
            request: &ResolvedGeneration,
            _timeout: Duration,
        ) -> Result<Vec<ImageSource>> {
            self.calls.lock().unwrap().push(request.clone());
            if let Some(message) = &self.fail_with {
                return Err(ImageGenError::Upstream(message.clone()));
            }
            Ok((1..=request.n)
                .map(|i| {
                    if self.inline {
                        ImageSource::Inline(format!("inline-{}", i).into_bytes())
                    } else {
                        ImageSource::Url(format!("https://images.test/{}.png", i))
                    }
                })
                .collect())
        }
    }

    pub struct FakeDownloader {
        pub failing_urls: HashSet<String>,
        pub fetched: Mutex<Vec<String>>,
    }

    impl FakeDownloader {
        pub fn ok() -> Self {
            Self {
                failing_urls: HashSet::new(),
                fetched: Mutex::new(Vec::new()),
            }
        }

        pub fn failing_on(url: &str) -> Self {
            let mut downloader = Self::ok();
            downloader.failing_urls.insert(url.to_string());
            downloader
        }
    }

    #[async_trait]
    impl ImageDownloader for FakeDownloader {
        async fn fetch(&self, url: &str, _timeout: Duration) -> Result<Vec<u8>> {
            self.fetched.lock().unwrap().push(url.to_string());
            if self.failing_urls.contains(url) {
                return Err(ImageGenError::Download(format!("{} timed out", url)));
            }
            Ok(format!("bytes of {}", url).into_bytes())
        }
    }
}
