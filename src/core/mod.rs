//! Core pipeline for Cardio Dashboard
//!
//! Coercion, smoothing, prediction and the orchestrator tying them together.

pub mod ai;
pub mod data;
pub mod fallback;
pub mod ingest;
pub mod signal;
pub mod smoothing;

pub use ai::PredictionGateway;
pub use ingest::Ingestor;
pub use smoothing::SmoothingBuffer;
