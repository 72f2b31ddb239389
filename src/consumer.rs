//! NATS message consumer for incoming loan applications

use crate::types::application::LoanApplication;
use anyhow::{Context, Result};
use async_nats::{Client, Subscriber};
use tracing::info;

/// Consumer for receiving applications from NATS
pub struct ApplicationConsumer {
    client: Client,
    subject: String,
}

impl ApplicationConsumer {
    /// Create a new application consumer
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Subscribe to the application subject
    pub async fn subscribe(&self) -> Result<Subscriber> {
        let subscriber = self.client.subscribe(self.subject.clone()).await?;
        info!(subject = %self.subject, "Subscribed to application subject");
        Ok(subscriber)
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}

/// Decode an application payload and bring its inputs into the form's range
pub fn decode_application(payload: &[u8]) -> Result<LoanApplication> {
    let application: LoanApplication =
        serde_json::from_slice(payload).context("Failed to deserialize application")?;
    Ok(application.clamped())
}
