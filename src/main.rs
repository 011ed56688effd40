//! Fraud Graph Analysis - Main Entry Point
//!
//! Receives CSV transaction batches over NATS, analyzes each batch and
//! replies with the analysis document. Batches are analyzed concurrently,
//! each on its own graph and model.

use anyhow::{Context, Result};
use fraud_graph_analysis::{
    config::{AppConfig, LoggingConfig},
    consumer::RequestConsumer,
    metrics::{MetricsReporter, PipelineMetrics},
    pipeline::AnalysisPipeline,
    producer::ResultPublisher,
};
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tracing::{error, info, warn};

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .or_else(|_| {
            tracing_subscriber::EnvFilter::try_new(format!(
                "fraud_graph_analysis={}",
                logging.level
            ))
        })
        .context("Invalid log filter")?;

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config/config.toml".to_string());
    let config = AppConfig::load_from_path(&config_path)?;

    init_logging(&config.logging)?;

    info!("Starting Fraud Graph Analysis service");
    info!(
        "Detection: {} trees, max_samples={}, contamination={:.3}, seed={}",
        config.detection.n_estimators,
        config.detection.max_samples,
        config.detection.contamination,
        config.detection.seed
    );

    let pipeline = Arc::new(AnalysisPipeline::new(&config)?);
    info!("Features: {:?}", pipeline.feature_names());
    let metrics = Arc::new(PipelineMetrics::new());

    let client = async_nats::connect(&config.nats.url)
        .await
        .with_context(|| format!("Failed to connect to NATS at {}", config.nats.url))?;
    info!("Connected to NATS at {}", config.nats.url);

    let consumer = RequestConsumer::new(client.clone(), &config.nats);
    let publisher = Arc::new(ResultPublisher::new(client.clone(), &config.nats.result_subject));

    let num_workers = config.pipeline.workers;
    info!(
        "Listening on {} ({:?}) with {} concurrent workers, fallback results to {}",
        consumer.subject(),
        consumer.delivery(),
        num_workers,
        publisher.subject()
    );

    let semaphore = Arc::new(Semaphore::new(num_workers));

    let metrics_clone = metrics.clone();
    tokio::spawn(async move {
        let reporter = MetricsReporter::new(metrics_clone, 60);
        reporter.start().await;
    });

    let mut subscription = consumer.subscribe().await?;

    while let Some(message) = subscription.next().await {
        let permit = semaphore
            .clone()
            .acquire_owned()
            .await
            .context("Worker semaphore closed")?;

        let pipeline = pipeline.clone();
        let publisher = publisher.clone();
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let start_time = Instant::now();
            let reply = message.reply.clone();
            let payload = message.payload;

            // CPU-bound; keep it off the async workers
            let outcome =
                tokio::task::spawn_blocking(move || pipeline.analyze_bytes(&payload)).await;

            match outcome {
                Ok(Ok(result)) => {
                    let processing_time = start_time.elapsed();
                    metrics.record_analysis(processing_time, &result.summary);

                    if let Err(e) = publisher.publish(reply, &result).await {
                        error!(error = %e, "Failed to publish analysis result");
                    } else {
                        info!(
                            rows = result.summary.total_transactions,
                            anomalies = result.summary.detected_anomalies,
                            processing_time_us = processing_time.as_micros() as u64,
                            "Analysis published"
                        );
                    }
                }
                Ok(Err(e)) => {
                    metrics.record_failure(&e);
                    warn!(error = %e, "Batch analysis failed");
                    if let Err(e) = publisher.publish_error(reply, e.to_string()).await {
                        error!(error = %e, "Failed to publish error reply");
                    }
                }
                Err(e) => {
                    error!(error = %e, "Analysis task panicked");
                    if let Err(e) = publisher
                        .publish_error(reply, "internal error".to_string())
                        .await
                    {
                        error!(error = %e, "Failed to publish error reply");
                    }
                }
            }

            drop(permit);
        });
    }

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}
