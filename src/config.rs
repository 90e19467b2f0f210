use crate::error::{ImageGenError, Result};
use crate::storage::FilenameStrategy;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_CONFIG_FILE: &str = "config.json";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub rate_limit_per_minute: usize,
}

#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub api_key: Option<String>,
    pub base_url: String,
}

#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub output_dir: PathBuf,
    pub record_store_path: PathBuf,
}

/// Defaults applied to every generation request. Loaded from the JSON
/// config file; any key left out keeps its default.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationDefaults {
    pub default_model: String,
    pub image_size: String,
    pub filename_base: String,
    pub quality: String,
    pub style: Option<String>,
    /// Seconds, applied to both the generation call and each download.
    pub timeout: u64,
    pub max_images: u32,
    pub max_prompt_chars: usize,
    pub filename_strategy: FilenameStrategy,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub openai: OpenAiConfig,
    pub storage: StorageConfig,
    pub generation: GenerationDefaults,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            host: "127.0.0.1".to_string(),
            port: 8080,
            rate_limit_per_minute: 10,
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let host = env::var("HOST").unwrap_or(defaults.host);
        let port = env::var("PORT")
            .ok()
            .and_then(|port| port.parse().ok())
            .unwrap_or(defaults.port);
        let rate_limit_per_minute = env::var("RATE_LIMIT_PER_MINUTE")
            .ok()
            .and_then(|val| val.parse().ok())
            .unwrap_or(defaults.rate_limit_per_minute);

        ServerConfig {
            host,
            port,
            rate_limit_per_minute,
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_rate_limit(mut self, per_minute: usize) -> Self {
        self.rate_limit_per_minute = per_minute;
        self
    }

    pub fn bind_address(&self) -> (String, u16) {
        (self.host.clone(), self.port)
    }
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        OpenAiConfig {
            api_key: None,
            base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
        }
    }
}

impl OpenAiConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let api_key = env::var("OPENAI_API_KEY").ok().filter(|key| !key.is_empty());
        let base_url =
            env::var("OPENAI_BASE_URL").unwrap_or_else(|_| DEFAULT_OPENAI_BASE_URL.to_string());

        OpenAiConfig { api_key, base_url }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn require_api_key(&self) -> Result<&str> {
        self.api_key
            .as_deref()
            .ok_or_else(|| ImageGenError::Config("OPENAI_API_KEY is not set".into()))
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        StorageConfig {
            output_dir: PathBuf::from("static/generated_images"),
            record_store_path: PathBuf::from("image_records.jsonl"),
        }
    }
}

impl StorageConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        let output_dir = env::var("OUTPUT_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.output_dir);
        let record_store_path = env::var("RECORD_STORE_PATH")
            .map(PathBuf::from)
            .unwrap_or(defaults.record_store_path);

        StorageConfig {
            output_dir,
            record_store_path,
        }
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    pub fn with_record_store(mut self, path: impl Into<PathBuf>) -> Self {
        self.record_store_path = path.into();
        self
    }
}

impl Default for GenerationDefaults {
    fn default() -> Self {
        GenerationDefaults {
            default_model: "dall-e-3".to_string(),
            image_size: "1024x1024".to_string(),
            filename_base: "generated_image".to_string(),
            quality: "standard".to_string(),
            style: None,
            timeout: 30,
            max_images: 4,
            max_prompt_chars: 4000,
            filename_strategy: FilenameStrategy::Unique,
        }
    }
}

impl GenerationDefaults {
    pub fn from_json_str(raw: &str) -> Result<Self> {
        serde_json::from_str(raw)
            .map_err(|e| ImageGenError::Config(format!("invalid generation config: {}", e)))
    }

    /// A missing file yields the built-in defaults; an unreadable or
    /// malformed one is an error.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            log::warn!(
                "⚠️  Config file {} not found, using built-in defaults",
                path.display()
            );
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path).map_err(|e| {
            ImageGenError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_json_str(&raw)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout)
    }

    pub fn with_style(mut self, style: impl Into<String>) -> Self {
        self.style = Some(style.into());
        self
    }

    pub fn with_filename_base(mut self, base: impl Into<String>) -> Self {
        self.filename_base = base.into();
        self
    }

    pub fn with_filename_strategy(mut self, strategy: FilenameStrategy) -> Self {
        self.filename_strategy = strategy;
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            server: ServerConfig::default(),
            openai: OpenAiConfig::default(),
            storage: StorageConfig::default(),
            generation: GenerationDefaults::default(),
        }
    }
}

impl AppConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads the environment and the generation config file named by
    /// `IMAGEGEN_CONFIG` (falls back to `config.json`).
    pub fn from_env() -> Result<Self> {
        let config_path =
            env::var("IMAGEGEN_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());
        let generation = GenerationDefaults::from_file(Path::new(&config_path))?;

        let config = AppConfig {
            server: ServerConfig::from_env(),
            openai: OpenAiConfig::from_env(),
            storage: StorageConfig::from_env(),
            generation,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_server(mut self, server: ServerConfig) -> Self {
        self.server = server;
        self
    }

    pub fn with_openai(mut self, openai: OpenAiConfig) -> Self {
        self.openai = openai;
        self
    }

    pub fn with_storage(mut self, storage: StorageConfig) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_generation(mut self, generation: GenerationDefaults) -> Self {
        self.generation = generation;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.generation.max_images == 0 {
            return Err(ImageGenError::Config("max_images must be at least 1".into()));
        }
        if self.generation.timeout == 0 {
            return Err(ImageGenError::Config("timeout must be positive".into()));
        }
        if self.generation.filename_base.trim().is_empty() {
            return Err(ImageGenError::Config("filename_base must not be empty".into()));
        }
        if self.server.rate_limit_per_minute == 0 {
            return Err(ImageGenError::Config(
                "RATE_LIMIT_PER_MINUTE must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
