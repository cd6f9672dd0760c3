//! Reading store for Cardio Dashboard
//!
//! Readings are kept in memory, newest first, up to a fixed capacity.
//! Nothing survives a restart.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::StoreError;
use crate::models::NormalizedReading;

/// Persistence seam for normalized readings.
#[cfg_attr(test, mockall::automock)]
pub trait ReadingRepository: Send + Sync {
    /// Prepend a reading, evicting the oldest once full.
    fn insert(&self, reading: Arc<NormalizedReading>) -> Result<(), StoreError>;

    /// Up to `limit` readings, newest first.
    fn list_recent(&self, limit: usize) -> Result<Vec<Arc<NormalizedReading>>, StoreError>;

    fn latest(&self) -> Result<Option<Arc<NormalizedReading>>, StoreError>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn capacity(&self) -> usize;
}

/// Fixed-capacity ring of readings.
#[derive(Debug)]
pub struct BoundedReadingStore {
    capacity: usize,
    readings: RwLock<VecDeque<Arc<NormalizedReading>>>,
}

impl BoundedReadingStore {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            readings: RwLock::new(VecDeque::with_capacity(capacity)),
        }
    }
}

impl ReadingRepository for BoundedReadingStore {
    fn insert(&self, reading: Arc<NormalizedReading>) -> Result<(), StoreError> {
        let mut readings = self.readings.write();
        readings.push_front(reading);
        readings.truncate(self.capacity);
        Ok(())
    }

    fn list_recent(&self, limit: usize) -> Result<Vec<Arc<NormalizedReading>>, StoreError> {
        Ok(self.readings.read().iter().take(limit).cloned().collect())
    }

    fn latest(&self) -> Result<Option<Arc<NormalizedReading>>, StoreError> {
        Ok(self.readings.read().front().cloned())
    }

    fn len(&self) -> usize {
        self.readings.read().len()
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{PredictionResult, PredictionSource, RiskLevel};
    use chrono::Utc;
    use uuid::Uuid;

    fn reading(device_id: &str, hr: f64) -> Arc<NormalizedReading> {
        Arc::new(NormalizedReading {
            id: Uuid::new_v4(),
            device_id: device_id.to_string(),
            timestamp: Utc::now(),
            hr: Some(hr),
            spo2: None,
            sbp: None,
            dbp: None,
            blood_sugar: None,
            ecg: Vec::new(),
            ppg: Vec::new(),
            smoothed_hr: Some(hr),
            smoothed_spo2: None,
            prediction: PredictionResult {
                source: PredictionSource::Fallback,
                disease: "Normal".into(),
                probability: 0.0,
                risk_level: RiskLevel::Low,
                confidence: 0.5,
                mean_bp: None,
                sbp_estimate: None,
                dbp_estimate: None,
                ecg_class: None,
                error: None,
            },
        })
    }

    #[test]
    fn empty_store() {
        let store = BoundedReadingStore::new(10);
        assert!(store.is_empty());
        assert!(store.latest().unwrap().is_none());
        assert!(store.list_recent(5).unwrap().is_empty());
    }

    #[test]
    fn newest_first() {
        let store = BoundedReadingStore::new(10);
        for hr in [60.0, 61.0, 62.0] {
            store.insert(reading("dev", hr)).unwrap();
        }

        let hrs: Vec<_> = store
            .list_recent(10)
            .unwrap()
            .iter()
            .map(|r| r.hr.unwrap())
            .collect();
        assert_eq!(hrs, vec![62.0, 61.0, 60.0]);
        assert_eq!(store.latest().unwrap().unwrap().hr, Some(62.0));
    }

    #[test]
    fn evicts_oldest_past_capacity() {
        let store = BoundedReadingStore::new(3);
        for i in 0..7 {
            store.insert(reading("dev", i as f64)).unwrap();
        }

        assert_eq!(store.len(), 3);
        let hrs: Vec<_> = store
            .list_recent(100)
            .unwrap()
            .iter()
            .map(|r| r.hr.unwrap())
            .collect();
        assert_eq!(hrs, vec![6.0, 5.0, 4.0]);
    }

    #[test]
    fn limit_caps_listing() {
        let store = BoundedReadingStore::new(10);
        for i in 0..10 {
            store.insert(reading("dev", i as f64)).unwrap();
        }
        assert_eq!(store.list_recent(4).unwrap().len(), 4);
        assert!(store.list_recent(0).unwrap().is_empty());
    }

    #[test]
    fn shares_the_inserted_reading() {
        let store = BoundedReadingStore::new(2);
        let r = reading("dev", 72.0);
        store.insert(Arc::clone(&r)).unwrap();
        assert!(Arc::ptr_eq(&r, &store.latest().unwrap().unwrap()));
    }
}
