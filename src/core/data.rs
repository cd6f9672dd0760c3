//! Best-effort coercion of untrusted device packets.

use serde_json::Value;

use crate::models::{CoercedPacket, RawPacket, VitalSigns, Waveforms};

/// Coerce every field of a raw packet. Never fails: anything that is not a
/// usable number becomes `None`, anything that is not a list becomes an
/// empty channel.
pub fn coerce_packet(raw: &RawPacket) -> CoercedPacket {
    CoercedPacket {
        device_id: raw.device_id.as_ref().and_then(coerce_device_id),
        vitals: VitalSigns {
            hr: raw.hr.as_ref().and_then(coerce_number),
            spo2: raw.spo2.as_ref().and_then(coerce_number),
            sbp: raw.sbp.as_ref().and_then(coerce_number),
            dbp: raw.dbp.as_ref().and_then(coerce_number),
            blood_sugar: raw.blood_sugar.as_ref().and_then(coerce_number),
        },
        waveforms: Waveforms {
            ecg: coerce_signal(raw.ecg.as_ref()),
            ppg: coerce_signal(raw.ppg.as_ref()),
        },
    }
}

/// Finite numbers and numeric strings; everything else is `None`.
pub fn coerce_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|n| n.is_finite())
}

/// A list of samples, either bare numbers or `{value}` / `{voltage}`
/// records. Unusable samples are dropped.
pub fn coerce_signal(value: Option<&Value>) -> Vec<f64> {
    match value {
        Some(Value::Array(samples)) => samples.iter().filter_map(sample_value).collect(),
        _ => Vec::new(),
    }
}

fn sample_value(sample: &Value) -> Option<f64> {
    match sample {
        Value::Object(record) => record
            .get("value")
            .or_else(|| record.get("voltage"))
            .and_then(coerce_number),
        other => coerce_number(other),
    }
}

fn coerce_device_id(value: &Value) -> Option<String> {
    let id = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        _ => return None,
    };
    (!id.is_empty()).then_some(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use test_case::test_case;

    #[test_case(json!(72) => Some(72.0) ; "integer")]
    #[test_case(json!(97.5) => Some(97.5) ; "float")]
    #[test_case(json!("118") => Some(118.0) ; "numeric string")]
    #[test_case(json!(" 76 ") => Some(76.0) ; "padded string")]
    #[test_case(json!("") => None ; "empty string")]
    #[test_case(json!("abc") => None ; "garbage string")]
    #[test_case(json!("NaN") => None ; "nan string")]
    #[test_case(json!("inf") => None ; "infinite string")]
    #[test_case(json!(true) => None ; "boolean")]
    #[test_case(json!([72]) => None ; "array")]
    #[test_case(json!({"hr": 72}) => None ; "object")]
    fn numbers(value: Value) -> Option<f64> {
        coerce_number(&value)
    }

    #[test]
    fn signal_accepts_records_and_drops_junk() {
        let value = json!([0.1, "0.2", {"value": 0.3}, {"voltage": 0.4}, {"mv": 9}, null, "x"]);
        assert_eq!(coerce_signal(Some(&value)), vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn non_array_signal_is_empty() {
        assert!(coerce_signal(Some(&json!("0.1,0.2"))).is_empty());
        assert!(coerce_signal(Some(&json!({"value": 1}))).is_empty());
        assert!(coerce_signal(None).is_empty());
    }

    #[test]
    fn malformed_packet_coerces_without_failing() {
        let raw = RawPacket::from_json(json!({
            "deviceId": "  ",
            "hr": "fast",
            "spo2": "97",
            "sbp": null,
            "dbp": [80],
            "bloodSugar": 5.6,
            "ecg": "not a list",
            "ppg": [1, 2, 3],
        }));
        let packet = coerce_packet(&raw);

        assert_eq!(packet.device_id, None);
        assert_eq!(packet.vitals.hr, None);
        assert_eq!(packet.vitals.spo2, Some(97.0));
        assert_eq!(packet.vitals.sbp, None);
        assert_eq!(packet.vitals.dbp, None);
        assert_eq!(packet.vitals.blood_sugar, Some(5.6));
        assert!(packet.waveforms.ecg.is_empty());
        assert_eq!(packet.waveforms.ppg, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn numeric_device_id_is_stringified() {
        let packet = coerce_packet(&RawPacket::from_json(json!({ "device_id": 42 })));
        assert_eq!(packet.device_id.as_deref(), Some("42"));
    }
}
