//! Real-time fan-out of ingested readings
//!
//! A single tokio broadcast channel feeds every connected dashboard. Slow
//! subscribers skip the events they missed; publishing never waits.

pub mod server;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::models::NormalizedReading;

/// Message pushed to subscribers, serialized as
/// `{"event": "new_reading", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RealtimeEvent {
    NewReading(Arc<NormalizedReading>),
}

#[derive(Debug, Clone)]
pub struct Broadcaster {
    tx: broadcast::Sender<RealtimeEvent>,
}

impl Broadcaster {
    /// `capacity` is how many events a subscriber may fall behind before
    /// it starts losing them.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Deliver to every current subscriber. Having none is not an error.
    pub fn publish(&self, event: RealtimeEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RealtimeEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PredictionResult, PredictionSource, RiskLevel};
    use chrono::Utc;
    use tokio::sync::broadcast::error::{RecvError, TryRecvError};
    use uuid::Uuid;

    fn reading(hr: f64) -> Arc<NormalizedReading> {
        Arc::new(NormalizedReading {
            id: Uuid::new_v4(),
            device_id: "device-001".into(),
            timestamp: Utc::now(),
            hr: Some(hr),
            spo2: Some(98.0),
            sbp: None,
            dbp: None,
            blood_sugar: None,
            ecg: Vec::new(),
            ppg: Vec::new(),
            smoothed_hr: Some(hr),
            smoothed_spo2: Some(98.0),
            prediction: PredictionResult {
                source: PredictionSource::Fallback,
                disease: "Normal".into(),
                probability: 0.0,
                risk_level: RiskLevel::Low,
                confidence: 0.5,
                mean_bp: Some(93.0),
                sbp_estimate: Some(132.0),
                dbp_estimate: Some(74.0),
                ecg_class: None,
                error: None,
            },
        })
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let broadcaster = Broadcaster::new(4);
        broadcaster.publish(RealtimeEvent::NewReading(reading(70.0)));
        assert_eq!(broadcaster.subscriber_count(), 0);
    }

    #[test]
    fn every_subscriber_receives_the_same_reading() {
        let broadcaster = Broadcaster::new(4);
        let mut a = broadcaster.subscribe();
        let mut b = broadcaster.subscribe();
        assert_eq!(broadcaster.subscriber_count(), 2);

        let sent = reading(70.0);
        broadcaster.publish(RealtimeEvent::NewReading(Arc::clone(&sent)));

        for rx in [&mut a, &mut b] {
            match rx.try_recv().unwrap() {
                RealtimeEvent::NewReading(got) => assert!(Arc::ptr_eq(&got, &sent)),
            }
        }
    }

    #[tokio::test]
    async fn lagging_subscriber_skips_ahead() {
        let broadcaster = Broadcaster::new(2);
        let mut rx = broadcaster.subscribe();
        for hr in [60.0, 61.0, 62.0, 63.0] {
            broadcaster.publish(RealtimeEvent::NewReading(reading(hr)));
        }

        assert!(matches!(rx.recv().await, Err(RecvError::Lagged(2))));
        let RealtimeEvent::NewReading(next) = rx.recv().await.unwrap();
        assert_eq!(next.hr, Some(62.0));
        let RealtimeEvent::NewReading(last) = rx.recv().await.unwrap();
        assert_eq!(last.hr, Some(63.0));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn wire_format_is_event_envelope() {
        let value = serde_json::to_value(RealtimeEvent::NewReading(reading(70.0))).unwrap();
        assert_eq!(value["event"], "new_reading");
        assert_eq!(value["data"]["deviceId"], "device-001");
        assert_eq!(value["data"]["smoothedHr"], 70.0);
        assert_eq!(value["data"]["prediction"]["source"], "fallback");
    }
}
