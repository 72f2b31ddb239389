//! NATS message producer for loan decisions

use crate::types::decision::{DecisionError, LoanDecision};
use anyhow::Result;
use async_nats::{Client, Subject};
use tracing::debug;

/// Producer for publishing decisions to NATS
#[derive(Clone)]
pub struct DecisionProducer {
    client: Client,
    subject: String,
}

/// Requester's inbox if there is one, otherwise the fallback subject
pub fn reply_target(reply: Option<Subject>, fallback: &str) -> Subject {
    reply.unwrap_or_else(|| Subject::from(fallback))
}

impl DecisionProducer {
    /// Create a new decision producer. `subject` receives decisions for
    /// applications submitted without a reply inbox.
    pub fn new(client: Client, subject: &str) -> Self {
        Self {
            client,
            subject: subject.to_string(),
        }
    }

    /// Send a decision to the requester's inbox, or to the decision subject
    pub async fn respond(&self, reply: Option<Subject>, decision: &LoanDecision) -> Result<()> {
        let payload = serde_json::to_vec(decision)?;

        let target = reply_target(reply, &self.subject);
        self.client.publish(target.clone(), payload.into()).await?;

        debug!(
            decision_id = %decision.decision_id,
            application_id = ?decision.application_id,
            status = ?decision.status,
            subject = %target,
            "Published loan decision"
        );

        Ok(())
    }

    /// Tell a waiting requester that its application could not be decided.
    ///
    /// Errors are only sent to reply inboxes, never to the decision subject.
    pub async fn respond_error(&self, reply: Option<Subject>, error: &DecisionError) -> Result<()> {
        let Some(inbox) = reply else {
            return Ok(());
        };
        let payload = serde_json::to_vec(error)?;
        self.client.publish(inbox.clone(), payload.into()).await?;

        debug!(subject = %inbox, error = %error.error, "Published error reply");
        Ok(())
    }

    /// Get the subject name
    pub fn subject(&self) -> &str {
        &self.subject
    }
}
