//! Request handlers
//!
//! Thin adapters: decode the request, call the [`Ingestor`], wrap the result
//! in the response envelope.
//!
//! [`Ingestor`]: crate::core::Ingestor

use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::ApiError;
use super::AppState;
use crate::models::RawPacket;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

/// `GET /`
pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type("text/plain; charset=utf-8")
        .body("Cardio Dashboard Backend is running")
}

/// `GET /api/health`
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "modelConfigured": state.ingestor.model_configured(),
        "subscribers": state.ingestor.broadcaster().subscriber_count(),
        "timestamp": Utc::now(),
    }))
}

/// `POST /api/readings`
pub async fn ingest_reading(
    state: web::Data<AppState>,
    body: web::Json<Value>,
) -> Result<HttpResponse, ApiError> {
    let reading = state
        .ingestor
        .ingest(RawPacket::from_json(body.into_inner()))
        .await?;

    Ok(HttpResponse::Ok().json(json!({
        "ok": true,
        "data": reading,
    })))
}

/// `GET /api/readings?limit=N`
pub async fn list_readings(
    state: web::Data<AppState>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse, ApiError> {
    let limit = query
        .limit
        .unwrap_or(state.config.ingest.default_limit)
        .min(state.ingestor.store().capacity());

    let readings = state.ingestor.recent(limit)?;
    Ok(HttpResponse::Ok().json(readings))
}

/// `GET /api/readings/latest`
pub async fn latest_reading(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let reading = state.ingestor.latest()?;
    Ok(HttpResponse::Ok().json(json!({
        "reading": reading,
        "timestamp": Utc::now(),
    })))
}

/// `POST /api/predict`
pub async fn predict(state: web::Data<AppState>, body: web::Json<Value>) -> HttpResponse {
    let prediction = state
        .ingestor
        .predict_only(RawPacket::from_json(body.into_inner()))
        .await;

    HttpResponse::Ok().json(json!({
        "success": true,
        "prediction": prediction,
        "timestamp": Utc::now(),
    }))
}
