use serde::{Deserialize, Serialize};

/// Body of `POST /generate-image`. Every field is optional at the wire level
/// so a missing prompt surfaces as a validation error rather than a
/// deserialization failure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub prompt: Option<String>,
    pub model: Option<String>,
    pub size: Option<String>,
    pub n: Option<u32>,
    pub quality: Option<String>,
    pub style: Option<String>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: Some(prompt.into()),
            ..Default::default()
        }
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_count(mut self, n: u32) -> Self {
        self.n = Some(n);
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// A request after validation with every default filled in. `prompt` is
/// the augmented prompt, both submitted upstream and recorded;
/// `original_prompt` is the caller's text, kept for logging.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedGeneration {
    pub original_prompt: String,
    pub prompt: String,
    pub model: String,
    pub size: String,
    pub n: u32,
    pub quality: String,
}

/// Where an image produced by the generation API can be read from.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageSource {
    Url(String),
    Inline(Vec<u8>),
}

impl ImageSource {
    pub const INLINE_SOURCE: &'static str = "inline:b64_json";

    pub fn describe(&self) -> &str {
        match self {
            ImageSource::Url(url) => url,
            ImageSource::Inline(_) => Self::INLINE_SOURCE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub message: String,
    pub files: Vec<String>,
}

impl GenerationResponse {
    pub const SUCCESS_MESSAGE: &'static str = "Images generated and saved successfully";

    pub fn saved(files: Vec<String>) -> Self {
        Self {
            message: Self::SUCCESS_MESSAGE.to_string(),
            files,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub records: usize,
}

#[derive(Debug, Deserialize)]
pub struct RecordsQuery {
    pub limit: Option<usize>,
}
