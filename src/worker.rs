//! Async boundary for callers that cannot block their thread.
//!
//! The core stays synchronous; these helpers run a blocking `send` or domain
//! check on tokio's blocking pool and hand the result back as a future.

use crate::core::config::Configuration;
use crate::core::error::{AppError, Result};
use crate::dispatch::{SendReceipt, SmtpDispatcher};
use crate::verification::DomainValidator;
use std::sync::Arc;

/// Fields of one outgoing message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl OutgoingMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        OutgoingMessage {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
        }
    }
}

pub async fn send_in_background(
    dispatcher: Arc<SmtpDispatcher>,
    config: Configuration,
    message: OutgoingMessage,
) -> Result<SendReceipt> {
    tokio::task::spawn_blocking(move || {
        dispatcher.send(&config, &message.to, &message.subject, &message.body)
    })
    .await
    .map_err(|e| AppError::Task(format!("send task failed: {}", e)))?
}

/// Runs the domain check off-thread. A task failure counts as a failed
/// check so the safeguard is never silently skipped.
pub async fn check_domain_in_background(validator: Arc<DomainValidator>, address: String) -> bool {
    match tokio::task::spawn_blocking(move || validator.check_domain_validity(&address)).await {
        Ok(valid) => valid,
        Err(e) => {
            tracing::warn!(target: "domain_check", "Domain check task failed: {}", e);
            false
        }
    }
}
