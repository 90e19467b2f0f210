use crate::{
    error::ImageGenError,
    models::{GenerationRequest, GenerationResponse, HealthResponse, RecordsQuery},
    server::AppState,
    storage::RecordStore,
};
use actix_web::{web, HttpRequest, HttpResponse};
use std::net::{IpAddr, Ipv4Addr};
use uuid::Uuid;

const INDEX_HTML: &str = include_str!("../../static/index.html");
const DEFAULT_RECORDS_LIMIT: usize = 50;
const MAX_RECORDS_LIMIT: usize = 500;

/// Requests without a peer address share one bucket.
fn client_key(req: &HttpRequest) -> IpAddr {
    req.peer_addr()
        .map(|addr| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn log_failure(request_id: &str, error: &ImageGenError) {
    match error {
        ImageGenError::Validation(msg) => log::warn!("[{}] Rejected request: {}", request_id, msg),
        ImageGenError::RateLimited(client) => {
            log::warn!("[{}] Rate limit exceeded for {}", request_id, client)
        }
        other => log::error!("[{}] ❌ Generation failed: {}", request_id, other),
    }
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/html; charset=utf-8")
        .body(INDEX_HTML)
}

pub async fn generate_image(
    req: HttpRequest,
    state: web::Data<AppState>,
    body: web::Json<GenerationRequest>,
) -> Result<HttpResponse, ImageGenError> {
    let request_id = Uuid::new_v4().to_string();
    let client = client_key(&req);

    if !state.rate_limiter.try_acquire(client) {
        let error = ImageGenError::RateLimited(client.to_string());
        log_failure(&request_id, &error);
        return Err(error);
    }

    log::info!("[{}] 📨 Generation request from {}", request_id, client);
    match state.service.generate(body.into_inner(), &request_id).await {
        Ok(files) => Ok(HttpResponse::Ok().json(GenerationResponse::saved(files))),
        Err(error) => {
            log_failure(&request_id, &error);
            Err(error)
        }
    }
}

pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let records = state.service.records();
    match (records.health_check().await, records.count().await) {
        (Ok(true), Ok(count)) => HttpResponse::Ok().json(HealthResponse {
            status: "ok".to_string(),
            records: count,
        }),
        (healthy, count) => {
            log::warn!(
                "Health check degraded: healthy={:?}, count={:?}",
                healthy.as_ref().map_err(|e| e.to_string()),
                count.as_ref().map_err(|e| e.to_string())
            );
            HttpResponse::ServiceUnavailable().json(HealthResponse {
                status: "degraded".to_string(),
                records: count.unwrap_or(0),
            })
        }
    }
}

pub async fn list_records(
    state: web::Data<AppState>,
    query: web::Query<RecordsQuery>,
) -> Result<HttpResponse, ImageGenError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_RECORDS_LIMIT)
        .min(MAX_RECORDS_LIMIT);
    let records = state.service.records().list(Some(limit)).await.map_err(|e| {
        log::error!("Failed to list records: {}", e);
        e
    })?;
    Ok(HttpResponse::Ok().json(records))
}
