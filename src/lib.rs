//! Fraud Graph Analysis Library
//!
//! Batch fraud-risk analysis of transaction records: a counterparty
//! relationship graph, structural node scores, isolation-forest anomaly
//! flags, and a renderable summary merging them with ground-truth labels.

pub mod composer;
pub mod config;
pub mod consumer;
pub mod error;
pub mod feature_extractor;
pub mod graph;
pub mod metrics;
pub mod models;
pub mod normalizer;
pub mod pipeline;
pub mod producer;
pub mod types;

pub use config::AppConfig;
pub use consumer::RequestConsumer;
pub use error::{AnalysisError, Result};
pub use pipeline::AnalysisPipeline;
pub use producer::ResultPublisher;
pub use types::{result::AnalysisResult, transaction::TransactionRecord};
