use actix_web::web;

use super::handlers;

/// Register every HTTP route except the websocket.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/", web::get().to(handlers::index)).service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/readings", web::post().to(handlers::ingest_reading))
            .route("/readings", web::get().to(handlers::list_readings))
            .route("/readings/latest", web::get().to(handlers::latest_reading))
            .route("/predict", web::post().to(handlers::predict)),
    );
}
