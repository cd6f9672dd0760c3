//! API module for Cardio Dashboard
//!
//! This module contains the HTTP surface for devices and dashboards.

pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;

use std::sync::Arc;

use crate::config::Config;
use crate::core::Ingestor;

pub use error::ApiError;
pub use routes::configure;

/// Shared application state
pub struct AppState {
    pub ingestor: Arc<Ingestor>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            ingestor: Arc::new(Ingestor::from_config(&config)),
            config,
        }
    }
}
