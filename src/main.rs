//! Cardio Dashboard
//!
//! Main entry point for the Cardio Dashboard backend.

use actix_web::{web, App, HttpServer};
use anyhow::Context;
use cardio_dashboard::api::{self, middleware, AppState};
use cardio_dashboard::{config, telemetry, websocket};
use tracing::info;
use tracing_actix_web::TracingLogger;

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a local .env if there is one
    dotenv::dotenv().ok();

    // Load configuration
    let config = config::load_config().context("failed to load configuration")?;

    // Initialize logging
    telemetry::init(&config.log);

    // Create app state
    let state = web::Data::new(AppState::new(config.clone()));
    match config.model.endpoint() {
        Some(endpoint) => info!(%endpoint, "model endpoint configured"),
        None => info!("no model endpoint configured, predictions use the fallback estimator"),
    }

    let bind = (config.server.host.clone(), config.server.port);
    info!(host = %bind.0, port = bind.1, "starting server");

    // Start HTTP server
    let mut server = HttpServer::new(move || {
        App::new()
            // Add app state
            .app_data(state.clone())
            .app_data(middleware::json_config())
            .app_data(middleware::query_config())
            .wrap(middleware::cors())
            // Request spans
            .wrap(TracingLogger::default())
            // API routes
            .configure(api::configure)
            // WebSocket route
            .service(websocket::server::websocket_route())
    });

    if let Some(workers) = config.server.workers {
        server = server.workers(workers);
    }

    server
        .bind(bind)
        .context("failed to bind server address")?
        .run()
        .await
        .context("server error")
}
