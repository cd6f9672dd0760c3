//! Device simulator
//!
//! Posts randomized vitals (and optionally synthetic ECG/PPG) to a running
//! backend at a fixed interval.

use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use rand::Rng;
use serde_json::{json, Value};
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "simulator", about = "Simulated bedside monitor")]
struct Args {
    /// Backend base URL
    #[arg(long, default_value = "http://localhost:5000")]
    url: String,

    #[arg(long, default_value = "device-001")]
    device_id: String,

    /// Milliseconds between packets
    #[arg(long, default_value_t = 1000)]
    interval_ms: u64,

    /// Stop after this many packets (runs forever if omitted)
    #[arg(long)]
    count: Option<u64>,

    /// Attach synthetic ECG and PPG channels
    #[arg(long)]
    waveforms: bool,

    /// Samples per waveform channel
    #[arg(long, default_value_t = 250)]
    samples: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let args = Args::parse();
    let endpoint = format!("{}/api/readings", args.url.trim_end_matches('/'));
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(15))
        .build()
        .context("failed to build HTTP client")?;

    info!(%endpoint, device_id = %args.device_id, "simulator started");

    let mut ticker = tokio::time::interval(Duration::from_millis(args.interval_ms.max(1)));
    let mut sent = 0u64;
    while args.count.map_or(true, |count| sent < count) {
        ticker.tick().await;

        let packet = build_packet(&args);
        match client.post(&endpoint).json(&packet).send().await {
            Ok(response) if response.status().is_success() => {
                let body: Value = response.json().await.unwrap_or(Value::Null);
                let prediction = &body["data"]["prediction"];
                info!(
                    hr = %packet["hr"],
                    disease = %prediction["disease"],
                    risk = %prediction["riskLevel"],
                    source = %prediction["source"],
                    "reading accepted"
                );
            }
            Ok(response) => warn!(status = %response.status(), "reading rejected"),
            Err(err) => warn!(error = %err, "failed to post reading"),
        }
        sent += 1;
    }

    Ok(())
}

fn build_packet(args: &Args) -> Value {
    let mut rng = rand::thread_rng();
    let hr: u32 = rng.gen_range(55..=135);
    let mut packet = json!({
        "deviceId": args.device_id,
        "hr": hr,
        "spo2": rng.gen_range(88..=100),
        "sbp": rng.gen_range(95..=160),
        "dbp": rng.gen_range(55..=100),
        "bloodSugar": (rng.gen_range(4.0..9.0_f64) * 10.0).round() / 10.0,
    });

    if args.waveforms {
        packet["ecg"] = json!(synthetic_ecg(&mut rng, args.samples, hr as f64));
        packet["ppg"] = json!(synthetic_ppg(&mut rng, args.samples, hr as f64));
    }
    packet
}

/// 125 Hz trace with a sharp spike once per beat.
fn synthetic_ecg(rng: &mut impl Rng, samples: usize, hr: f64) -> Vec<f64> {
    let period = 125.0 * 60.0 / hr;
    (0..samples)
        .map(|i| {
            let phase = (i as f64 % period) / period;
            let qrs = if phase < 0.04 { 1.2 * (1.0 - phase / 0.04) } else { 0.0 };
            let t_wave = 0.25 * (-((phase - 0.35) / 0.06).powi(2)).exp();
            qrs + t_wave + rng.gen_range(-0.03..0.03)
        })
        .collect()
}

/// 125 Hz pulse wave: smooth rise and slow decay per beat.
fn synthetic_ppg(rng: &mut impl Rng, samples: usize, hr: f64) -> Vec<f64> {
    let period = 125.0 * 60.0 / hr;
    (0..samples)
        .map(|i| {
            let phase = (i as f64 % period) / period;
            let pulse = (std::f64::consts::PI * phase).sin().powi(2) * (-2.0 * phase).exp();
            1.0 + pulse + rng.gen_range(-0.01..0.01)
        })
        .collect()
}
