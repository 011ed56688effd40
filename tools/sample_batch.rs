//! Sample Batch Sender
//!
//! Generates a synthetic CSV transaction batch and sends it to the analysis
//! service as a NATS request, then logs the summary of the reply.

use rand::Rng;
use serde_json::Value;
use std::time::Duration;
use tracing::{info, warn};

/// Synthetic batch generator for testing
struct BatchGenerator {
    rng: rand::rngs::ThreadRng,
}

impl BatchGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
        }
    }

    /// Build a CSV with `Time,Amount,Class` and, when `with_parties`,
    /// explicit `Sender,Receiver` columns drawn from a small pool so the
    /// graph has repeated pairs.
    fn generate(&mut self, rows: u64, fraud_rate: f64, with_parties: bool) -> String {
        let mut csv = String::from(if with_parties {
            "Time,Amount,Class,Sender,Receiver\n"
        } else {
            "Time,Amount,Class\n"
        });

        for i in 0..rows {
            let fraud = self.rng.gen_bool(fraud_rate);
            let amount: f64 = if fraud {
                self.rng.gen_range(1000.0..10000.0) // High amount
            } else {
                self.rng.gen_range(1.0..500.0)
            };

            csv.push_str(&format!("{},{:.2},{}", i, amount, fraud as u8));
            if with_parties {
                let sender = self.rng.gen_range(1000..1200);
                let receiver = if fraud {
                    // Fraud funnels into a few mule accounts
                    self.rng.gen_range(4990..5000)
                } else {
                    self.rng.gen_range(1000..1200)
                };
                csv.push_str(&format!(",{},{}", sender, receiver));
            }
            csv.push('\n');
        }

        csv
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_batch=info".parse()?),
        )
        .init();

    info!("Starting Sample Batch Sender");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let nats_url = args.get(1).map(|s| s.as_str()).unwrap_or("nats://localhost:4222");
    let subject = args.get(2).map(|s| s.as_str()).unwrap_or("analysis.requests");
    let rows: u64 = args.get(3).and_then(|s| s.parse().ok()).unwrap_or(1000);
    let fraud_rate: f64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(0.02);
    let with_parties = args.get(5).map(|s| s == "parties").unwrap_or(false);

    info!(
        nats_url = %nats_url,
        subject = %subject,
        rows = rows,
        fraud_rate = fraud_rate,
        with_parties = with_parties,
        "Configuration loaded"
    );

    let csv = BatchGenerator::new().generate(rows, fraud_rate, with_parties);

    let client = match async_nats::connect(nats_url).await {
        Ok(c) => {
            info!("Connected to NATS");
            c
        }
        Err(e) => {
            warn!(error = %e, "Failed to connect to NATS. Running in dry-run mode.");
            return run_dry_mode(&csv);
        }
    };

    let reply = tokio::time::timeout(
        Duration::from_secs(30),
        client.request(subject.to_string(), csv.into_bytes().into()),
    )
    .await??;

    let body: Value = serde_json::from_slice(&reply.payload)?;
    if let Some(err) = body.get("error") {
        warn!(error = %err, "Service rejected batch");
        return Ok(());
    }

    info!(
        summary = %body["summary"],
        nodes = body["graph"]["nodes"].as_array().map(|n| n.len()).unwrap_or(0),
        edges = body["graph"]["edges"].as_array().map(|e| e.len()).unwrap_or(0),
        "Received analysis"
    );

    if let Some(anomalies) = body["anomalies"].as_array() {
        for anomaly in anomalies.iter().take(10) {
            info!("Anomaly: {}", anomaly);
        }
    }

    Ok(())
}

fn run_dry_mode(csv: &str) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no NATS connection)");

    for line in csv.lines().take(11) {
        info!("{}", line);
    }
    info!("... {} lines total", csv.lines().count());

    Ok(())
}
