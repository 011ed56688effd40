//! NATS publisher for analysis results

use crate::types::result::AnalysisResult;
use anyhow::Result;
use async_nats::{Client, Subject};
use serde::Serialize;
use tracing::debug;

/// Error document sent when a batch cannot be analyzed
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReply {
    pub error: String,
}

/// Publisher for analysis results.
///
/// Replies go to the request's reply subject when it has one, otherwise
/// to the configured result subject.
#[derive(Clone)]
pub struct ResultPublisher {
    client: Client,
    subject: String,
}

impl ResultPublisher {
    /// Create a new result publisher
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Publish an analysis result
    pub async fn publish(&self, reply: Option<Subject>, result: &AnalysisResult) -> Result<()> {
        self.send(reply, result).await?;

        debug!(
            total_transactions = result.summary.total_transactions,
            detected_anomalies = result.summary.detected_anomalies,
            "Published analysis result"
        );

        Ok(())
    }

    /// Publish an error reply
    pub async fn publish_error(&self, reply: Option<Subject>, message: String) -> Result<()> {
        self.send(reply, &ErrorReply { error: message }).await
    }

    async fn send<T: Serialize>(&self, reply: Option<Subject>, body: &T) -> Result<()> {
        let payload = serde_json::to_vec(body)?;
        let target = reply.unwrap_or_else(|| Subject::from(self.subject.as_str()));

        self.client.publish(target, payload.into()).await?;
        Ok(())
    }

    /// Get the fallback subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}
