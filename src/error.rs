use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde::Serialize;

pub const PROMPT_REQUIRED: &str = "Prompt is required";
pub const GENERATION_FAILED: &str = "Image generation failed";
pub const DOWNLOAD_FAILED: &str = "Failed to download image";
pub const RATE_LIMITED: &str = "Rate limit exceeded";
pub const INTERNAL_ERROR: &str = "An internal error occurred";

#[derive(Debug, thiserror::Error)]
pub enum ImageGenError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Upstream API error: {0}")]
    Upstream(String),
    #[error("Download error: {0}")]
    Download(String),
    #[error("Rate limited: {0}")]
    RateLimited(String),
    #[error("Storage error: {0}")]
    Storage(String),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, ImageGenError>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: String,
}

impl ImageGenError {
    /// Message safe to hand back to the caller. Upstream and internal
    /// details stay in the server log.
    pub fn public_message(&self) -> String {
        match self {
            ImageGenError::Validation(msg) => msg.clone(),
            ImageGenError::Upstream(_) => GENERATION_FAILED.to_string(),
            ImageGenError::Download(_) => DOWNLOAD_FAILED.to_string(),
            ImageGenError::RateLimited(_) => RATE_LIMITED.to_string(),
            ImageGenError::Storage(_)
            | ImageGenError::Io(_)
            | ImageGenError::Config(_)
            | ImageGenError::Internal(_) => INTERNAL_ERROR.to_string(),
        }
    }
}

impl ResponseError for ImageGenError {
    fn status_code(&self) -> StatusCode {
        match self {
            ImageGenError::Validation(_) | ImageGenError::Upstream(_) => StatusCode::BAD_REQUEST,
            ImageGenError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            ImageGenError::Download(_)
            | ImageGenError::Storage(_)
            | ImageGenError::Io(_)
            | ImageGenError::Config(_)
            | ImageGenError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code()).json(ErrorBody {
            error: self.public_message(),
        })
    }
}

impl From<serde_json::Error> for ImageGenError {
    fn from(e: serde_json::Error) -> Self {
        ImageGenError::Storage(e.to_string())
    }
}
