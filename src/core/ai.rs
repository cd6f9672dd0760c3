//! Prediction gateway
//!
//! Calls the external model with a bounded timeout, turns whatever JSON it
//! answers with into a [`PredictionResult`], and degrades to the rule-based
//! estimator on any failure. [`PredictionGateway::predict`] always resolves.
//!
//! Response handling is split in two steps: [`parse_response`] classifies
//! untrusted JSON into a [`RawModelResponse`] variant, and [`interpret`]
//! applies labels, risk thresholds and blood-pressure derivation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use url::Url;

use crate::config::{Config, FallbackConfig, ModelConfig, RiskConfig};
use crate::core::data::coerce_number;
use crate::core::fallback;
use crate::core::signal::{preprocess, Modality};
use crate::error::PredictionError;
use crate::models::{PredictionResult, PredictionSource, RiskLevel, VitalSigns, Waveforms};

/// Rough mean-pressure inversion factors; see DESIGN.md.
pub const SBP_FROM_MEAN: f64 = 1.33;
pub const DBP_FROM_MEAN: f64 = 0.67;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    Waveform,
    Vitals,
}

/// Body sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ModelRequest {
    /// Both channels fitted and normalized to the model's window.
    Waveform { ppg: Vec<f64>, ecg: Vec<f64> },
    /// Point vitals only.
    Vitals { payload: VitalsPayload },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VitalsPayload {
    pub hr: Option<f64>,
    pub spo2: Option<f64>,
    pub sbp: Option<f64>,
    pub dbp: Option<f64>,
    pub blood_sugar: Option<f64>,
}

impl ModelRequest {
    pub fn kind(&self) -> RequestKind {
        match self {
            ModelRequest::Waveform { .. } => RequestKind::Waveform,
            ModelRequest::Vitals { .. } => RequestKind::Vitals,
        }
    }
}

/// Outbound call to the model. Implementations return the decoded JSON body
/// of a successful response; timeouts are enforced by the gateway.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ModelTransport: Send + Sync {
    async fn invoke(&self, request: &ModelRequest) -> Result<Value, PredictionError>;
}

/// `POST <endpoint>` with a JSON body.
pub struct HttpModelTransport {
    client: Client,
    endpoint: Url,
}

impl HttpModelTransport {
    pub fn new(endpoint: Url) -> Self {
        Self {
            client: Client::new(),
            endpoint,
        }
    }
}

#[async_trait]
impl ModelTransport for HttpModelTransport {
    async fn invoke(&self, request: &ModelRequest) -> Result<Value, PredictionError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(PredictionError::Status(status.as_u16()));
        }

        Ok(response.json::<Value>().await?)
    }
}

/// A class reference as the model gave it.
#[derive(Debug, Clone, PartialEq)]
pub enum ClassRef {
    Name(String),
    Index(usize),
}

/// Scalar `prediction` field: a class index or a verbatim label.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Number(f64),
    Text(String),
}

/// Every response shape the gateway knows how to read.
#[derive(Debug, Clone, PartialEq)]
pub enum RawModelResponse {
    /// `{prediction, probability?}`, or a bare `{mean_bp}` with no prediction.
    ScalarPrediction {
        prediction: Option<ScalarValue>,
        probability: Option<f64>,
    },
    /// `{class | class_label | label, confidence | probability | score?}`
    ClassLabel {
        class: ClassRef,
        confidence: Option<f64>,
    },
    /// `{disease, probability?}` or the same nested under `result`.
    DiseaseResult {
        disease: String,
        probability: Option<f64>,
    },
    /// Per-class probabilities in label-table order.
    ProbabilityArray(Vec<f64>),
    PlainString(String),
    Unrecognized,
}

/// A classified response plus any mean pressure it carried.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedResponse {
    pub shape: RawModelResponse,
    pub mean_bp: Option<f64>,
}

const CLASS_KEYS: [&str; 3] = ["class", "class_label", "label"];
const SCORE_KEYS: [&str; 4] = ["confidence", "probability", "score", "risk_score"];
const MEAN_BP_KEYS: [&str; 3] = ["mean_bp", "meanBp", "bp"];

/// Classify a model response. Shapes are tried in a fixed order: arrays,
/// strings, then objects by class label, disease/result, and finally
/// prediction or mean pressure.
pub fn parse_response(body: &Value) -> ParsedResponse {
    match body {
        Value::Array(items) => ParsedResponse {
            shape: parse_probabilities(items),
            mean_bp: None,
        },
        Value::String(text) => ParsedResponse {
            shape: match text.trim() {
                "" => RawModelResponse::Unrecognized,
                label => RawModelResponse::PlainString(label.to_string()),
            },
            mean_bp: None,
        },
        Value::Number(_) => ParsedResponse {
            shape: RawModelResponse::ScalarPrediction {
                prediction: coerce_number(body).map(ScalarValue::Number),
                probability: None,
            },
            mean_bp: None,
        },
        Value::Object(fields) => parse_object(fields),
        _ => ParsedResponse {
            shape: RawModelResponse::Unrecognized,
            mean_bp: None,
        },
    }
}

fn parse_object(fields: &Map<String, Value>) -> ParsedResponse {
    let mean_bp = first_number(fields, &MEAN_BP_KEYS);
    let score = first_number(fields, &SCORE_KEYS);

    if let Some(class) = CLASS_KEYS
        .iter()
        .find_map(|key| fields.get(*key).and_then(class_ref))
    {
        return ParsedResponse {
            shape: RawModelResponse::ClassLabel {
                class,
                confidence: score,
            },
            mean_bp,
        };
    }

    if let Some(disease) = fields.get("disease").and_then(non_empty_str) {
        return ParsedResponse {
            shape: RawModelResponse::DiseaseResult {
                disease: disease.to_string(),
                probability: score,
            },
            mean_bp,
        };
    }

    match fields.get("result") {
        Some(Value::Object(inner)) => {
            let nested = parse_object(inner);
            if nested.shape != RawModelResponse::Unrecognized {
                return ParsedResponse {
                    mean_bp: nested.mean_bp.or(mean_bp),
                    shape: nested.shape,
                };
            }
        }
        Some(Value::String(text)) if !text.trim().is_empty() => {
            return ParsedResponse {
                shape: RawModelResponse::DiseaseResult {
                    disease: text.trim().to_string(),
                    probability: score,
                },
                mean_bp,
            };
        }
        _ => {}
    }

    let prediction = fields.get("prediction").and_then(|value| {
        coerce_number(value)
            .map(ScalarValue::Number)
            .or_else(|| non_empty_str(value).map(|label| ScalarValue::Text(label.to_string())))
    });

    let shape = if prediction.is_some() || mean_bp.is_some() {
        RawModelResponse::ScalarPrediction {
            prediction,
            probability: score,
        }
    } else {
        RawModelResponse::Unrecognized
    };

    ParsedResponse { shape, mean_bp }
}

fn parse_probabilities(items: &[Value]) -> RawModelResponse {
    // batch of one: [[p0, p1, ...]]
    if let [Value::Array(row)] = items {
        return parse_probabilities(row);
    }
    if items.is_empty() {
        return RawModelResponse::Unrecognized;
    }
    let probabilities: Option<Vec<f64>> = items
        .iter()
        .map(|item| item.as_f64().filter(|p| p.is_finite()))
        .collect();
    probabilities.map_or(RawModelResponse::Unrecognized, RawModelResponse::ProbabilityArray)
}

fn first_number(fields: &Map<String, Value>, keys: &[&str]) -> Option<f64> {
    keys.iter()
        .find_map(|key| fields.get(*key).and_then(coerce_number))
}

fn class_ref(value: &Value) -> Option<ClassRef> {
    match value {
        Value::String(_) => non_empty_str(value).map(|s| ClassRef::Name(s.to_string())),
        // numpy-backed servers often send indices as 1.0
        Value::Number(n) => n
            .as_f64()
            .filter(|i| i.is_finite() && *i >= 0.0 && i.fract() == 0.0)
            .map(|i| ClassRef::Index(i as usize)),
        _ => None,
    }
}

fn non_empty_str(value: &Value) -> Option<&str> {
    value.as_str().map(str::trim).filter(|s| !s.is_empty())
}

/// Everything [`interpret`] needs besides the response itself.
#[derive(Debug, Clone, Copy)]
pub struct Interpretation<'a> {
    pub kind: RequestKind,
    pub model: &'a ModelConfig,
    pub risk: &'a RiskConfig,
    pub fallback: &'a FallbackConfig,
}

/// Map a classified response to a model-sourced prediction.
pub fn interpret(
    parsed: ParsedResponse,
    ctx: Interpretation<'_>,
) -> Result<PredictionResult, PredictionError> {
    let labels = match ctx.kind {
        RequestKind::Waveform => &ctx.model.ecg_labels,
        RequestKind::Vitals => &ctx.model.vitals_labels,
    };
    let from_table = |index: usize| {
        labels
            .get(index)
            .cloned()
            .unwrap_or_else(|| format!("Class {}", index))
    };
    let default_probability = ctx.model.default_probability;
    let estimates = parsed.mean_bp.filter(|m| m.is_finite()).map(pressure_from_mean);

    let (label, probability, tabled) = match parsed.shape {
        RawModelResponse::ProbabilityArray(probabilities) => {
            let (index, probability) = probabilities
                .iter()
                .copied()
                .enumerate()
                .fold((0, f64::NEG_INFINITY), |best, (i, p)| {
                    if p > best.1 {
                        (i, p)
                    } else {
                        best
                    }
                });
            (from_table(index), probability, true)
        }
        RawModelResponse::ClassLabel { class, confidence } => {
            let probability = confidence.unwrap_or(default_probability);
            match class {
                ClassRef::Name(name) => (name, probability, false),
                ClassRef::Index(index) => (from_table(index), probability, true),
            }
        }
        RawModelResponse::DiseaseResult {
            disease,
            probability,
        } => (disease, probability.unwrap_or(default_probability), false),
        RawModelResponse::ScalarPrediction {
            prediction: Some(ScalarValue::Number(value)),
            probability,
        } => {
            if value < 0.0 {
                return Err(PredictionError::UnrecognizedShape);
            }
            let index = value.round() as usize;
            let label = match ctx.kind {
                RequestKind::Vitals if index > 0 => from_table(1),
                _ => from_table(index),
            };
            (label, probability.unwrap_or(default_probability), true)
        }
        RawModelResponse::ScalarPrediction {
            prediction: Some(ScalarValue::Text(label)),
            probability,
        } => (label, probability.unwrap_or(default_probability), false),
        RawModelResponse::ScalarPrediction {
            prediction: None,
            probability,
        } => {
            let (sbp, dbp, _) = estimates.ok_or(PredictionError::UnrecognizedShape)?;
            let (label, weight) = pressure_category(sbp, dbp, ctx.fallback);
            (label.to_string(), probability.unwrap_or(weight), false)
        }
        RawModelResponse::PlainString(label) => (label, default_probability, false),
        RawModelResponse::Unrecognized => return Err(PredictionError::UnrecognizedShape),
    };

    let probability = probability.clamp(0.0, 1.0);
    let ecg_class = (tabled && ctx.kind == RequestKind::Waveform).then(|| label.clone());

    Ok(PredictionResult {
        source: PredictionSource::Model,
        risk_level: risk_level(&label, probability, ctx.risk),
        disease: label,
        probability,
        confidence: 1.0,
        mean_bp: estimates.map(|(_, _, mean)| mean),
        sbp_estimate: estimates.map(|(sbp, _, _)| sbp),
        dbp_estimate: estimates.map(|(_, dbp, _)| dbp),
        ecg_class,
        error: None,
    })
}

/// Risk level from a label and the probability attached to it.
///
/// Labels containing one of the configured cardiac keywords use the lower
/// keyword thresholds; every other label uses the general ones.
pub fn risk_level(label: &str, probability: f64, risk: &RiskConfig) -> RiskLevel {
    let cardiac = risk.keywords.iter().any(|keyword| label.contains(keyword.as_str()));
    let (high, medium) = if cardiac {
        (risk.keyword_high, risk.keyword_medium)
    } else {
        (risk.high, risk.medium)
    };

    if probability >= high {
        RiskLevel::High
    } else if probability >= medium {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

/// (sbp, dbp, mean) from a mean arterial pressure.
fn pressure_from_mean(mean_bp: f64) -> (f64, f64, f64) {
    (
        (mean_bp * SBP_FROM_MEAN).round(),
        (mean_bp * DBP_FROM_MEAN).round(),
        mean_bp,
    )
}

fn pressure_category(sbp: f64, dbp: f64, rules: &FallbackConfig) -> (&'static str, f64) {
    if sbp >= rules.hypertension_sbp || dbp >= rules.hypertension_dbp {
        (fallback::HYPERTENSION, rules.hypertension_weight)
    } else if sbp < rules.hypotension_sbp || dbp < rules.hypotension_dbp {
        (fallback::HYPOTENSION, rules.hypotension_weight)
    } else {
        (fallback::NORMAL, 0.0)
    }
}

/// Model client with a rule-based safety net.
pub struct PredictionGateway {
    transport: Option<Arc<dyn ModelTransport>>,
    model: ModelConfig,
    risk: RiskConfig,
    fallback: FallbackConfig,
}

impl PredictionGateway {
    /// HTTP transport when the configured URL is usable, otherwise every
    /// prediction goes straight to the fallback estimator.
    pub fn from_config(config: &Config) -> Self {
        let transport = config
            .model
            .endpoint()
            .map(|endpoint| Arc::new(HttpModelTransport::new(endpoint)) as Arc<dyn ModelTransport>);
        Self::new(
            transport,
            config.model.clone(),
            config.risk.clone(),
            config.fallback.clone(),
        )
    }

    pub fn new(
        transport: Option<Arc<dyn ModelTransport>>,
        model: ModelConfig,
        risk: RiskConfig,
        fallback: FallbackConfig,
    ) -> Self {
        Self {
            transport,
            model,
            risk,
            fallback,
        }
    }

    pub fn is_configured(&self) -> bool {
        self.transport.is_some()
    }

    /// Predict for one reading. Never fails; model problems are recorded
    /// in the fallback result's `error`.
    #[instrument(skip_all)]
    pub async fn predict(&self, vitals: &VitalSigns, waveforms: &Waveforms) -> PredictionResult {
        match self.predict_with_model(vitals, waveforms).await {
            Ok(prediction) => prediction,
            Err(err) => {
                if matches!(err, PredictionError::NotConfigured) {
                    debug!("no model configured, using fallback estimator");
                } else {
                    warn!(error = %err, "model prediction failed, using fallback estimator");
                }
                fallback::estimate(vitals, &self.fallback).with_error(err.to_string())
            }
        }
    }

    async fn predict_with_model(
        &self,
        vitals: &VitalSigns,
        waveforms: &Waveforms,
    ) -> Result<PredictionResult, PredictionError> {
        let transport = self.transport.as_ref().ok_or(PredictionError::NotConfigured)?;

        let request = self.build_request(vitals, waveforms);
        let kind = request.kind();
        let timeout = self.timeout_for(kind);

        let body = tokio::time::timeout(timeout, transport.invoke(&request))
            .await
            .map_err(|_| PredictionError::Timeout(timeout))??;

        let prediction = interpret(
            parse_response(&body),
            Interpretation {
                kind,
                model: &self.model,
                risk: &self.risk,
                fallback: &self.fallback,
            },
        )?;
        debug!(label = %prediction.disease, probability = prediction.probability, "model prediction");
        Ok(prediction)
    }

    /// Waveform payload when either channel has samples, vitals otherwise.
    pub fn build_request(&self, vitals: &VitalSigns, waveforms: &Waveforms) -> ModelRequest {
        if waveforms.is_empty() {
            return ModelRequest::Vitals {
                payload: VitalsPayload {
                    hr: vitals.hr,
                    spo2: vitals.spo2,
                    sbp: vitals.sbp,
                    dbp: vitals.dbp,
                    blood_sugar: vitals.blood_sugar,
                },
            };
        }

        let length = self.model.signal_length;
        ModelRequest::Waveform {
            ppg: preprocess(&waveforms.ppg, length, Modality::Ppg),
            ecg: preprocess(&waveforms.ecg, length, Modality::Ecg),
        }
    }

    fn timeout_for(&self, kind: RequestKind) -> Duration {
        match kind {
            RequestKind::Waveform => self.model.waveform_timeout(),
            RequestKind::Vitals => self.model.vitals_timeout(),
        }
    }
}
