//! Request-level configuration shared by every worker
//!
//! Dashboards are served from other origins and devices post without
//! reliable headers, so CORS is open and JSON is accepted regardless of
//! content type. Body and query decode failures use the API error envelope.

use actix_cors::Cors;
use actix_web::{error, web};
use tracing::debug;

use super::error::ApiError;

/// Largest accepted request body; long waveforms are a few hundred KB.
pub const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

pub fn cors() -> Cors {
    Cors::permissive()
}

pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(MAX_BODY_BYTES)
        .content_type_required(false)
        .error_handler(|err, _req| {
            debug!(error = %err, "rejected request body");
            error::Error::from(ApiError::BadRequest(err.to_string()))
        })
}

pub fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err, _req| {
        debug!(error = %err, "rejected query string");
        error::Error::from(ApiError::BadRequest(err.to_string()))
    })
}
