//! Rule-based risk estimator used whenever the model cannot answer.
//!
//! Pure and total: any combination of present or missing vitals yields a
//! result. Scores are additive per rule; the probability is capped so a
//! rule of thumb never reports near-certainty.

use crate::config::FallbackConfig;
use crate::models::{PredictionResult, PredictionSource, RiskLevel, VitalSigns};

pub const HYPERTENSION: &str = "Hypertension Risk";
pub const TACHYCARDIA: &str = "Tachycardia Risk";
pub const RESPIRATORY: &str = "Respiratory/Cardiovascular Risk";
pub const HYPOTENSION: &str = "Hypotension Risk";
pub const CARDIOVASCULAR: &str = "Cardiovascular Disease Risk";
pub const NORMAL: &str = "Normal";

/// Score and label accumulated from the rules, before capping.
#[derive(Debug, Clone, PartialEq)]
pub struct Assessment {
    pub score: f64,
    pub label: &'static str,
    pub risk_level: RiskLevel,
}

/// Apply the rules in order. Later rules overwrite earlier labels except
/// tachycardia, which only labels a reading nothing else has.
pub fn assess(vitals: &VitalSigns, rules: &FallbackConfig) -> Assessment {
    let mut score = 0.0;
    let mut label: Option<&'static str> = None;

    let above = |value: Option<f64>, limit: f64| value.map_or(false, |v| v >= limit);
    let below = |value: Option<f64>, limit: f64| value.map_or(false, |v| v < limit);

    if above(vitals.sbp, rules.hypertension_sbp) || above(vitals.dbp, rules.hypertension_dbp) {
        score += rules.hypertension_weight;
        label = Some(HYPERTENSION);
    }

    if vitals.hr.map_or(false, |hr| hr > rules.tachycardia_hr) {
        score += rules.tachycardia_weight;
        label = label.or(Some(TACHYCARDIA));
    }

    if below(vitals.spo2, rules.hypoxia_spo2) {
        score += rules.hypoxia_weight;
        label = Some(RESPIRATORY);
    }

    if below(vitals.sbp, rules.hypotension_sbp) || below(vitals.dbp, rules.hypotension_dbp) {
        score += rules.hypotension_weight;
        label = Some(HYPOTENSION);
    }

    // weights are decimal; keep 0.3 + 0.3 from landing a hair under 0.6
    let score = (score * 1e6_f64).round() / 1e6;

    let (label, risk_level) = if score >= rules.high_score {
        (CARDIOVASCULAR, RiskLevel::High)
    } else if score >= rules.medium_score {
        (label.unwrap_or(CARDIOVASCULAR), RiskLevel::Medium)
    } else {
        (NORMAL, RiskLevel::Low)
    };

    Assessment {
        score,
        label,
        risk_level,
    }
}

/// Best-effort prediction from point vitals alone.
pub fn estimate(vitals: &VitalSigns, rules: &FallbackConfig) -> PredictionResult {
    let assessment = assess(vitals, rules);
    let (sbp, dbp, mean_bp) = estimate_pressure(vitals);

    PredictionResult {
        source: PredictionSource::Fallback,
        disease: assessment.label.to_string(),
        // f64::clamp panics on a NaN or negative cap
        probability: assessment.score.min(rules.max_probability).max(0.0),
        risk_level: assessment.risk_level,
        confidence: rules.confidence,
        mean_bp: Some(mean_bp),
        sbp_estimate: Some(sbp),
        dbp_estimate: Some(dbp),
        ecg_class: None,
        error: None,
    }
}

/// Linear pressure estimate from heart rate and saturation, with resting
/// defaults for whichever is missing. Returns (sbp, dbp, mean).
fn estimate_pressure(vitals: &VitalSigns) -> (f64, f64, f64) {
    let hr = vitals.hr.unwrap_or(70.0);
    let spo2 = vitals.spo2.unwrap_or(98.0);

    let sbp = (90.0 + 0.6 * hr + (100.0 - spo2) * 0.2).round();
    let dbp = (60.0 + 0.2 * hr).round();
    let mean = (dbp + (sbp - dbp) / 3.0).round();
    (sbp, dbp, mean)
}
