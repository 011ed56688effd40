//! NATS consumer for incoming analysis requests

use crate::config::NatsConfig;
use anyhow::Result;
use async_nats::{Client, Subscriber};
use tracing::info;

/// How requests on the subject are shared between service instances
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// Every instance receives every request
    Fanout,
    /// One instance of the named queue group receives each request
    Queue(String),
}

impl Delivery {
    pub fn from_config(config: &NatsConfig) -> Self {
        match config.queue_group.as_deref().map(str::trim) {
            Some(group) if !group.is_empty() => Delivery::Queue(group.to_string()),
            _ => Delivery::Fanout,
        }
    }
}

/// Consumer for receiving CSV batches from NATS
pub struct RequestConsumer {
    client: Client,
    subject: String,
    delivery: Delivery,
}

impl RequestConsumer {
    pub fn new(client: Client, config: &NatsConfig) -> Self {
        Self {
            client,
            subject: config.request_subject.clone(),
            delivery: Delivery::from_config(config),
        }
    }

    /// Subscribe to the request subject, joining the queue group if one is set
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = match &self.delivery {
            Delivery::Fanout => self.client.subscribe(self.subject.clone()).await?,
            Delivery::Queue(group) => {
                self.client
                    .queue_subscribe(self.subject.clone(), group.clone())
                    .await?
            }
        };
        info!(subject = %self.subject, delivery = ?self.delivery, "Subscribed to analysis requests");
        Ok(subscriber)
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn delivery(&self) -> &Delivery {
        &self.delivery
    }
}
