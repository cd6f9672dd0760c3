//! Cardio Dashboard core library
//!
//! This module exports the reading ingestion pipeline: packet coercion,
//! per-device smoothing, model prediction with a rule-based fallback,
//! bounded history and real-time fan-out to dashboard clients.

pub mod api;
pub mod core;
pub mod db;
pub mod error;
pub mod models;
pub mod telemetry;
pub mod websocket;

/// Application configuration
pub mod config {
    use std::time::Duration;

    use serde::Deserialize;
    use url::Url;
    use validator::{Validate, ValidationError};

    #[derive(Debug, Clone, Default, Deserialize, Validate)]
    #[serde(default)]
    pub struct Config {
        #[validate]
        pub server: ServerConfig,
        #[validate]
        pub model: ModelConfig,
        #[validate]
        pub smoothing: SmoothingConfig,
        #[validate]
        pub store: StoreConfig,
        #[validate]
        pub ingest: IngestConfig,
        #[validate]
        pub websocket: WebSocketConfig,
        #[validate]
        pub risk: RiskConfig,
        #[validate]
        pub fallback: FallbackConfig,
        pub log: LogConfig,
    }

    #[derive(Debug, Clone, Deserialize, Validate)]
    #[serde(default)]
    pub struct ServerConfig {
        pub host: String,
        pub port: u16,
        #[validate(range(min = 1))]
        pub workers: Option<usize>,
    }

    impl Default for ServerConfig {
        fn default() -> Self {
            Self {
                host: "0.0.0.0".into(),
                port: 5000,
                workers: None,
            }
        }
    }

    /// External predictive model boundary.
    #[derive(Debug, Clone, Deserialize, Validate)]
    #[serde(default)]
    pub struct ModelConfig {
        /// Model endpoint. Absent, blank or non-http(s) means "not configured".
        pub url: Option<String>,
        #[validate(range(min = 1))]
        pub waveform_timeout_ms: u64,
        #[validate(range(min = 1))]
        pub vitals_timeout_ms: u64,
        /// Samples per channel the waveform model was trained on.
        #[validate(range(min = 1))]
        pub signal_length: usize,
        /// Class table for waveform model outputs, in index order.
        #[validate(length(min = 1))]
        pub ecg_labels: Vec<String>,
        /// Class table for vitals-only model outputs, in index order.
        #[validate(length(min = 2))]
        pub vitals_labels: Vec<String>,
        /// Probability assumed when the model names a class without a score.
        #[validate(range(min = 0.0, max = 1.0))]
        pub default_probability: f64,
    }

    impl Default for ModelConfig {
        fn default() -> Self {
            Self {
                url: None,
                waveform_timeout_ms: 10_000,
                vitals_timeout_ms: 2_000,
                signal_length: 125,
                ecg_labels: vec![
                    "Normal".into(),
                    "Arrhythmia".into(),
                    "Myocardial Infarction".into(),
                    "Abnormal Heartbeat".into(),
                ],
                vitals_labels: vec!["Normal".into(), "Disease".into()],
                default_probability: 0.5,
            }
        }
    }

    impl ModelConfig {
        /// The parsed endpoint, if one is usable.
        pub fn endpoint(&self) -> Option<Url> {
            let raw = self.url.as_deref()?.trim();
            if raw.is_empty() {
                return None;
            }
            let url = Url::parse(raw).ok()?;
            matches!(url.scheme(), "http" | "https").then_some(url)
        }

        pub fn waveform_timeout(&self) -> Duration {
            Duration::from_millis(self.waveform_timeout_ms)
        }

        pub fn vitals_timeout(&self) -> Duration {
            Duration::from_millis(self.vitals_timeout_ms)
        }
    }

    #[derive(Debug, Clone, Deserialize, Validate)]
    #[serde(default)]
    pub struct SmoothingConfig {
        #[validate(range(min = 1))]
        pub window: usize,
    }

    impl Default for SmoothingConfig {
        fn default() -> Self {
            Self { window: 5 }
        }
    }

    #[derive(Debug, Clone, Deserialize, Validate)]
    #[serde(default)]
    pub struct StoreConfig {
        #[validate(range(min = 1))]
        pub capacity: usize,
    }

    impl Default for StoreConfig {
        fn default() -> Self {
            Self { capacity: 1000 }
        }
    }

    #[derive(Debug, Clone, Deserialize, Validate)]
    #[serde(default)]
    pub struct IngestConfig {
        #[validate(length(min = 1))]
        pub default_device_id: String,
        /// Page size for `GET /api/readings` without a `limit`.
        #[validate(range(min = 1))]
        pub default_limit: usize,
    }

    impl Default for IngestConfig {
        fn default() -> Self {
            Self {
                default_device_id: "device-001".into(),
                default_limit: 200,
            }
        }
    }

    #[derive(Debug, Clone, Deserialize, Validate)]
    #[serde(default)]
    pub struct WebSocketConfig {
        /// Seconds between server pings.
        #[validate(range(min = 1))]
        pub ping_interval: u64,
        /// Seconds of silence before a client is dropped.
        #[validate(range(min = 1))]
        pub client_timeout: u64,
        /// Events buffered per subscriber before it starts skipping.
        #[validate(range(min = 1))]
        pub channel_capacity: usize,
    }

    impl Default for WebSocketConfig {
        fn default() -> Self {
            Self {
                ping_interval: 10,
                client_timeout: 30,
                channel_capacity: 256,
            }
        }
    }

    /// Thresholds mapping a model label and probability to a risk level.
    #[derive(Debug, Clone, Deserialize, Validate)]
    #[serde(default)]
    #[validate(schema(function = "validate_risk"))]
    pub struct RiskConfig {
        /// Case-sensitive substrings marking a cardiac finding.
        pub keywords: Vec<String>,
        #[validate(range(min = 0.0, max = 1.0))]
        pub keyword_high: f64,
        #[validate(range(min = 0.0, max = 1.0))]
        pub keyword_medium: f64,
        #[validate(range(min = 0.0, max = 1.0))]
        pub high: f64,
        #[validate(range(min = 0.0, max = 1.0))]
        pub medium: f64,
    }

    fn validate_risk(risk: &RiskConfig) -> Result<(), ValidationError> {
        let values = [risk.keyword_high, risk.keyword_medium, risk.high, risk.medium];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ValidationError::new("non_finite_threshold"));
        }
        if risk.medium > risk.high || risk.keyword_medium > risk.keyword_high {
            return Err(ValidationError::new("medium_above_high"));
        }
        Ok(())
    }

    impl Default for RiskConfig {
        fn default() -> Self {
            Self {
                keywords: vec!["Infarction".into(), "Arrhythmia".into(), "Abnormal".into()],
                keyword_high: 0.7,
                keyword_medium: 0.4,
                high: 0.8,
                medium: 0.5,
            }
        }
    }

    /// Weights and cut-offs of the rule-based estimator.
    #[derive(Debug, Clone, Deserialize, Validate)]
    #[serde(default)]
    #[validate(schema(function = "validate_fallback"))]
    pub struct FallbackConfig {
        #[validate(range(min = 0.0, max = 400.0))]
        pub hypertension_sbp: f64,
        #[validate(range(min = 0.0, max = 400.0))]
        pub hypertension_dbp: f64,
        #[validate(range(min = 0.0, max = 1.0))]
        pub hypertension_weight: f64,
        #[validate(range(min = 0.0, max = 400.0))]
        pub tachycardia_hr: f64,
        #[validate(range(min = 0.0, max = 1.0))]
        pub tachycardia_weight: f64,
        #[validate(range(min = 0.0, max = 100.0))]
        pub hypoxia_spo2: f64,
        #[validate(range(min = 0.0, max = 1.0))]
        pub hypoxia_weight: f64,
        #[validate(range(min = 0.0, max = 400.0))]
        pub hypotension_sbp: f64,
        #[validate(range(min = 0.0, max = 400.0))]
        pub hypotension_dbp: f64,
        #[validate(range(min = 0.0, max = 1.0))]
        pub hypotension_weight: f64,
        #[validate(range(min = 0.0, max = 1.0))]
        pub high_score: f64,
        #[validate(range(min = 0.0, max = 1.0))]
        pub medium_score: f64,
        /// Rule-based answers never claim more than this.
        #[validate(range(min = 0.0, max = 0.95))]
        pub max_probability: f64,
        #[validate(range(min = 0.0, max = 1.0))]
        pub confidence: f64,
    }

    fn validate_fallback(rules: &FallbackConfig) -> Result<(), ValidationError> {
        let values = [
            rules.hypertension_sbp,
            rules.hypertension_dbp,
            rules.hypertension_weight,
            rules.tachycardia_hr,
            rules.tachycardia_weight,
            rules.hypoxia_spo2,
            rules.hypoxia_weight,
            rules.hypotension_sbp,
            rules.hypotension_dbp,
            rules.hypotension_weight,
            rules.high_score,
            rules.medium_score,
            rules.max_probability,
            rules.confidence,
        ];
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ValidationError::new("non_finite_rule"));
        }
        if rules.medium_score > rules.high_score {
            return Err(ValidationError::new("medium_above_high"));
        }
        Ok(())
    }

    impl Default for FallbackConfig {
        fn default() -> Self {
            Self {
                hypertension_sbp: 140.0,
                hypertension_dbp: 90.0,
                hypertension_weight: 0.3,
                tachycardia_hr: 100.0,
                tachycardia_weight: 0.2,
                hypoxia_spo2: 94.0,
                hypoxia_weight: 0.3,
                hypotension_sbp: 90.0,
                hypotension_dbp: 60.0,
                hypotension_weight: 0.2,
                high_score: 0.6,
                medium_score: 0.3,
                max_probability: 0.95,
                confidence: 0.5,
            }
        }
    }

    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
    #[serde(rename_all = "lowercase")]
    pub enum LogFormat {
        #[default]
        Pretty,
        Json,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(default)]
    pub struct LogConfig {
        pub format: LogFormat,
    }

    #[derive(Debug, thiserror::Error)]
    pub enum LoadError {
        #[error(transparent)]
        Source(#[from] ::config::ConfigError),
        #[error("invalid configuration: {0}")]
        Invalid(#[from] validator::ValidationErrors),
    }

    /// Load configuration from file and environment
    pub fn load_config() -> Result<Config, LoadError> {
        let env = std::env::var("CARDIO_ENV").unwrap_or_else(|_| "development".into());

        let settings = ::config::Config::builder()
            // Start with default settings
            .add_source(::config::File::with_name("config/default").required(false))
            // Override with environment-specific settings
            .add_source(::config::File::with_name(&format!("config/{}", env)).required(false))
            // Override with environment variables, e.g. CARDIO__STORE__CAPACITY=5000
            .add_source(
                ::config::Environment::with_prefix("CARDIO")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("model.url", std::env::var("ML_MODEL_URL").ok())?
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

}
