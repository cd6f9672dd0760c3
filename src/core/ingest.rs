//! Ingestion orchestrator
//!
//! One packet in, one stored and broadcast reading out:
//! coerce → smooth → predict → assemble → persist → publish.
//! Persistence happens before publishing, so every reading a dashboard sees
//! is already queryable.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, field, info, instrument, Span};
use uuid::Uuid;

use crate::config::Config;
use crate::core::ai::PredictionGateway;
use crate::core::data::coerce_packet;
use crate::core::smoothing::{Metric, SmoothingBuffer};
use crate::db::{BoundedReadingStore, ReadingRepository};
use crate::error::{IngestError, StoreError};
use crate::models::{NormalizedReading, PredictionResult, RawPacket};
use crate::websocket::{Broadcaster, RealtimeEvent};

pub struct Ingestor {
    smoothing: SmoothingBuffer,
    gateway: PredictionGateway,
    store: Arc<dyn ReadingRepository>,
    broadcaster: Broadcaster,
    default_device_id: String,
}

impl Ingestor {
    /// Wire the pipeline from configuration with the in-memory store.
    pub fn from_config(config: &Config) -> Self {
        let smoothing = SmoothingBuffer::new(config.smoothing.window);
        let store = BoundedReadingStore::new(config.store.capacity);
        info!(
            window = smoothing.window(),
            capacity = store.capacity(),
            "ingestion pipeline ready"
        );

        Self::new(
            smoothing,
            PredictionGateway::from_config(config),
            Arc::new(store),
            Broadcaster::new(config.websocket.channel_capacity),
            config.ingest.default_device_id.clone(),
        )
    }

    pub fn new(
        smoothing: SmoothingBuffer,
        gateway: PredictionGateway,
        store: Arc<dyn ReadingRepository>,
        broadcaster: Broadcaster,
        default_device_id: impl Into<String>,
    ) -> Self {
        Self {
            smoothing,
            gateway,
            store,
            broadcaster,
            default_device_id: default_device_id.into(),
        }
    }

    /// Process one device packet. Only a store failure is an error; a
    /// failed model call still yields a reading with a fallback prediction,
    /// and a failed insert publishes nothing.
    #[instrument(skip_all, fields(device_id = field::Empty))]
    pub async fn ingest(&self, raw: RawPacket) -> Result<Arc<NormalizedReading>, IngestError> {
        // arrival time, not prediction completion time
        let timestamp = Utc::now();
        let packet = coerce_packet(&raw);
        let device_id = packet
            .device_id
            .unwrap_or_else(|| self.default_device_id.clone());
        Span::current().record("device_id", device_id.as_str());

        let smoothed_hr = packet
            .vitals
            .hr
            .map(|hr| self.smoothing.update(&device_id, Metric::HeartRate, hr));
        let smoothed_spo2 = packet
            .vitals
            .spo2
            .map(|spo2| self.smoothing.update(&device_id, Metric::Spo2, spo2));

        let prediction = self.gateway.predict(&packet.vitals, &packet.waveforms).await;

        let vitals = packet.vitals;
        let reading = Arc::new(NormalizedReading {
            id: Uuid::new_v4(),
            device_id,
            timestamp,
            hr: vitals.hr,
            spo2: vitals.spo2,
            sbp: vitals.sbp,
            dbp: vitals.dbp,
            blood_sugar: vitals.blood_sugar,
            ecg: packet.waveforms.ecg,
            ppg: packet.waveforms.ppg,
            smoothed_hr,
            smoothed_spo2,
            prediction,
        });

        if let Err(err) = self.store.insert(Arc::clone(&reading)) {
            error!(error = %err, "failed to store reading");
            return Err(err.into());
        }
        self.broadcaster
            .publish(RealtimeEvent::NewReading(Arc::clone(&reading)));

        debug!(
            disease = %reading.prediction.disease,
            risk = ?reading.prediction.risk_level,
            source = ?reading.prediction.source,
            "reading ingested"
        );
        Ok(reading)
    }

    /// Prediction for a packet without smoothing, storing or broadcasting.
    #[instrument(skip_all)]
    pub async fn predict_only(&self, raw: RawPacket) -> PredictionResult {
        let packet = coerce_packet(&raw);
        let prediction = self.gateway.predict(&packet.vitals, &packet.waveforms).await;
        debug!(disease = %prediction.disease, "ad-hoc prediction");
        prediction
    }

    pub fn recent(&self, limit: usize) -> Result<Vec<Arc<NormalizedReading>>, StoreError> {
        self.store.list_recent(limit)
    }

    pub fn latest(&self) -> Result<Option<Arc<NormalizedReading>>, StoreError> {
        self.store.latest()
    }

    pub fn model_configured(&self) -> bool {
        self.gateway.is_configured()
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    pub fn store(&self) -> &dyn ReadingRepository {
        self.store.as_ref()
    }
}
