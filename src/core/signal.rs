//! Waveform preprocessing
//!
//! Fits raw ECG/PPG channels to the fixed window the waveform model was
//! trained on and rescales them the same way its training data was.
//! Everything here is a pure function of its input.

/// Added to the standard deviation before dividing.
pub const ZSCORE_EPSILON: f64 = 1e-8;

/// ECG z-scores are divided by this to match the model's input range.
pub const ECG_SCALE: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Modality {
    /// Z-score, then scaled down by [`ECG_SCALE`].
    Ecg,
    /// Min-max to [0, 1].
    Ppg,
}

/// Fit `signal` to `target_length` samples and normalize it for `modality`.
pub fn preprocess(signal: &[f64], target_length: usize, modality: Modality) -> Vec<f64> {
    let fitted = pad_or_truncate(signal, target_length);
    match modality {
        Modality::Ecg => z_score_normalize(&fitted),
        Modality::Ppg => min_max_normalize(&fitted),
    }
}

/// Truncate to the first `target_length` samples, or pad by repeating the
/// last sample. An empty signal becomes all zeros.
pub fn pad_or_truncate(signal: &[f64], target_length: usize) -> Vec<f64> {
    if signal.is_empty() {
        return vec![0.0; target_length];
    }
    if signal.len() >= target_length {
        return signal[..target_length].to_vec();
    }

    let pad = signal
        .last()
        .copied()
        .filter(|value| value.is_finite())
        .unwrap_or(0.0);

    let mut fitted = Vec::with_capacity(target_length);
    fitted.extend_from_slice(signal);
    fitted.resize(target_length, pad);
    fitted
}

/// Scale to [0, 1]. A flat signal has no range and maps to zeros.
pub fn min_max_normalize(signal: &[f64]) -> Vec<f64> {
    let (min, max) = signal
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = max - min;

    if !range.is_finite() || range <= 0.0 {
        return vec![0.0; signal.len()];
    }

    signal.iter().map(|v| (v - min) / range).collect()
}

/// Population z-score with [`ZSCORE_EPSILON`] in the denominator, divided
/// by [`ECG_SCALE`].
pub fn z_score_normalize(signal: &[f64]) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }

    let n = signal.len() as f64;
    let mean = signal.iter().sum::<f64>() / n;
    let variance = signal.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    let std = variance.sqrt() + ZSCORE_EPSILON;

    signal.iter().map(|v| (v - mean) / (std * ECG_SCALE)).collect()
}
