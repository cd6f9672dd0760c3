use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use super::prediction::PredictionResult;

/// A device packet as posted.
///
/// Nothing is required and nothing is trusted: every field keeps the raw
/// JSON value until [`crate::core::data::coerce_packet`] turns it into
/// numbers. Snake-case aliases used by older firmware are folded in here.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPacket {
    pub device_id: Option<Value>,
    pub hr: Option<Value>,
    pub spo2: Option<Value>,
    pub sbp: Option<Value>,
    pub dbp: Option<Value>,
    pub blood_sugar: Option<Value>,
    pub ecg: Option<Value>,
    pub ppg: Option<Value>,
}

impl RawPacket {
    /// Build from an arbitrary JSON body. Anything but an object is an
    /// empty packet; explicit `null`s count as absent.
    pub fn from_json(body: Value) -> Self {
        let Value::Object(mut fields) = body else {
            return Self::default();
        };

        let mut take = |keys: &[&str]| {
            keys.iter()
                .find_map(|key| fields.remove(*key).filter(|value| !value.is_null()))
        };

        Self {
            device_id: take(&["deviceId", "device_id"]),
            hr: take(&["hr"]),
            spo2: take(&["spo2"]),
            sbp: take(&["sbp"]),
            dbp: take(&["dbp"]),
            blood_sugar: take(&["bloodSugar", "blood_sugar"]),
            ecg: take(&["ecg", "ecg_data"]),
            ppg: take(&["ppg"]),
        }
    }
}

/// Point vitals after coercion.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VitalSigns {
    pub hr: Option<f64>,
    pub spo2: Option<f64>,
    pub sbp: Option<f64>,
    pub dbp: Option<f64>,
    pub blood_sugar: Option<f64>,
}

/// Raw waveform channels after coercion, unpadded and unscaled.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Waveforms {
    pub ecg: Vec<f64>,
    pub ppg: Vec<f64>,
}

impl Waveforms {
    pub fn is_empty(&self) -> bool {
        self.ecg.is_empty() && self.ppg.is_empty()
    }
}

/// A packet after coercion, before smoothing and prediction.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoercedPacket {
    pub device_id: Option<String>,
    pub vitals: VitalSigns,
    pub waveforms: Waveforms,
}

/// The canonical, enriched reading. Built once per ingestion and never
/// mutated afterwards; it is shared as `Arc<NormalizedReading>` between the
/// store and the broadcast channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedReading {
    pub id: Uuid,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
    pub hr: Option<f64>,
    pub spo2: Option<f64>,
    pub sbp: Option<f64>,
    pub dbp: Option<f64>,
    pub blood_sugar: Option<f64>,
    pub ecg: Vec<f64>,
    pub ppg: Vec<f64>,
    pub smoothed_hr: Option<f64>,
    pub smoothed_spo2: Option<f64>,
    pub prediction: PredictionResult,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn from_json_reads_aliases() {
        let packet = RawPacket::from_json(json!({
            "device_id": "bed-7",
            "blood_sugar": 5.4,
            "ecg_data": [0.1, 0.2],
            "hr": 80,
        }));

        assert_eq!(packet.device_id, Some(json!("bed-7")));
        assert_eq!(packet.blood_sugar, Some(json!(5.4)));
        assert_eq!(packet.ecg, Some(json!([0.1, 0.2])));
        assert_eq!(packet.hr, Some(json!(80)));
        assert!(packet.ppg.is_none());
    }

    #[test]
    fn camel_case_wins_over_alias() {
        let packet = RawPacket::from_json(json!({
            "deviceId": "primary",
            "device_id": "legacy",
        }));
        assert_eq!(packet.device_id, Some(json!("primary")));
    }

    #[test]
    fn nulls_fall_through_to_alias() {
        let packet = RawPacket::from_json(json!({ "ecg": null, "ecg_data": [1.0] }));
        assert_eq!(packet.ecg, Some(json!([1.0])));
    }

    #[test]
    fn non_object_body_is_empty_packet() {
        assert_eq!(RawPacket::from_json(json!([1, 2, 3])), RawPacket::default());
        assert_eq!(RawPacket::from_json(Value::Null), RawPacket::default());
    }
}
