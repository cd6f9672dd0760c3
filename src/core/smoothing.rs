//! Per-device moving averages
//!
//! Each (device, metric) pair owns a FIFO window of the most recent raw
//! samples. Buffers are created lazily on the first sample and live for
//! the life of the process.

use std::collections::VecDeque;

use dashmap::DashMap;

/// Smoothing window used when none is configured.
pub const DEFAULT_WINDOW: usize = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Metric {
    HeartRate,
    Spo2,
}

/// Keyed moving-average store. Shared across HTTP workers; DashMap's
/// per-entry guard serializes updates to the same key.
#[derive(Debug)]
pub struct SmoothingBuffer {
    window: usize,
    buffers: DashMap<(String, Metric), VecDeque<f64>>,
}

impl Default for SmoothingBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl SmoothingBuffer {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            buffers: DashMap::new(),
        }
    }

    pub fn window(&self) -> usize {
        self.window
    }

    /// Push `raw` into the window for `(device_id, metric)` and return the
    /// window mean rounded to the nearest integer.
    pub fn update(&self, device_id: &str, metric: Metric, raw: f64) -> f64 {
        let mut buffer = self
            .buffers
            .entry((device_id.to_owned(), metric))
            .or_insert_with(|| VecDeque::with_capacity(self.window));

        buffer.push_back(raw);
        while buffer.len() > self.window {
            buffer.pop_front();
        }

        let mean = buffer.iter().sum::<f64>() / buffer.len() as f64;
        mean.round()
    }

    /// Number of (device, metric) windows currently held.
    pub fn tracked(&self) -> usize {
        self.buffers.len()
    }
}
