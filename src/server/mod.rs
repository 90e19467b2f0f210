pub mod handlers;

use crate::{
    client::OpenAiClient,
    config::AppConfig,
    error::{ImageGenError, Result},
    rate_limiter::RateLimiter,
    service::ImageGenerationService,
    storage::JsonlRecordStore,
};
use actix_web::{middleware::Logger, web, App, HttpServer};
use std::sync::Arc;
use std::time::Duration;

pub struct AppState {
    pub service: ImageGenerationService,
    pub rate_limiter: RateLimiter,
}

impl AppState {
    pub fn new(service: ImageGenerationService, rate_limiter: RateLimiter) -> Self {
        Self {
            service,
            rate_limiter,
        }
    }
}

/// Routes plus the extractor configs. Malformed bodies and query strings
/// become the same `{"error": ...}` shape as every other failure.
pub fn configure(cfg: &mut web::ServiceConfig) {
    let json_config = web::JsonConfig::default()
        .limit(64 * 1024)
        .error_handler(|err, _req| {
            ImageGenError::Validation(format!("Invalid JSON body: {}", err)).into()
        });

    let query_config = web::QueryConfig::default().error_handler(|err, _req| {
        ImageGenError::Validation(format!("Invalid query string: {}", err)).into()
    });

    cfg.app_data(json_config)
        .app_data(query_config)
        .route("/", web::get().to(handlers::index))
        .route("/generate-image", web::post().to(handlers::generate_image))
        .route("/health", web::get().to(handlers::health))
        .route("/records", web::get().to(handlers::list_records));
}

pub async fn run(config: AppConfig) -> Result<()> {
    let client = OpenAiClient::new(&config.openai)?;
    let records = Arc::new(JsonlRecordStore::new(config.storage.record_store_path.clone()).await?);
    let service = ImageGenerationService::from_config(&config, &client, records);
    service.writer().ensure_output_dir().await?;

    let state = web::Data::new(AppState::new(
        service,
        RateLimiter::per_minute(config.server.rate_limit_per_minute),
    ));

    let pruning = state.clone();
    actix_web::rt::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        loop {
            interval.tick().await;
            pruning.rate_limiter.prune();
        }
    });

    log::info!("✅ Server initialized, accepting connections");
    HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(Logger::new("%a \"%r\" %s %b %Dms"))
            .configure(configure)
    })
    .bind(config.server.bind_address())?
    .run()
    .await?;

    log::info!("👋 Server stopped");
    Ok(())
}
