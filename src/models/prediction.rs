use serde::{Deserialize, Serialize};

/// Where a prediction came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PredictionSource {
    Model,
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

/// Normalized outcome of the prediction step, whichever path produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionResult {
    pub source: PredictionSource,
    /// Disease or risk label.
    pub disease: String,
    pub probability: f64,
    pub risk_level: RiskLevel,
    /// 1.0 for model answers, the fixed degraded value for fallback ones.
    pub confidence: f64,
    pub mean_bp: Option<f64>,
    pub sbp_estimate: Option<f64>,
    pub dbp_estimate: Option<f64>,
    /// Set when the label was taken from the ECG class table.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ecg_class: Option<String>,
    /// Why the model was not used (fallback only).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PredictionResult {
    pub fn is_fallback(&self) -> bool {
        self.source == PredictionSource::Fallback
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}
