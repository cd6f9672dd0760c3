//! Data model shared by the pipeline, the HTTP API and the realtime channel.

pub mod prediction;
pub mod reading;

pub use prediction::{PredictionResult, PredictionSource, RiskLevel};
pub use reading::{CoercedPacket, NormalizedReading, RawPacket, VitalSigns, Waveforms};
