//! SMTP dispatch over an implicit-TLS session.
//!
//! Every call to [`SmtpDispatcher::send`] opens a fresh session, authenticates,
//! submits one message to one envelope recipient, and drops the session on
//! return. There is no retry and no connection reuse.

use super::result::SendReceipt;
use crate::core::config::Configuration;
use crate::core::error::{AppError, Result};
use lettre::message::{header::ContentType, Mailbox};
use lettre::transport::smtp::authentication::{Credentials, Mechanism};
use lettre::{Message, SmtpTransport, Transport};
use secrecy::ExposeSecret;

/// Reply codes that mean the server refused the credentials.
const AUTH_REJECTION_CODES: [u16; 3] = [530, 534, 535];

/// Host and port of the submission server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpEndpoint {
    pub host: String,
    pub port: u16,
}

impl std::fmt::Display for SmtpEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// One-shot delivery of a built message. Implementations must not retry and
/// must release the session before returning.
pub trait SmtpConnector: Send + Sync {
    fn deliver(
        &self,
        endpoint: &SmtpEndpoint,
        credentials: Credentials,
        message: &Message,
    ) -> Result<SendReceipt>;
}

/// Connector backed by lettre's blocking transport with implicit TLS.
#[derive(Debug, Default, Clone, Copy)]
pub struct LettreConnector;

impl SmtpConnector for LettreConnector {
    fn deliver(
        &self,
        endpoint: &SmtpEndpoint,
        credentials: Credentials,
        message: &Message,
    ) -> Result<SendReceipt> {
        // `relay` wraps the socket in TLS from the first byte (SMTPS), unlike
        // `starttls_relay`.
        let transport = SmtpTransport::relay(&endpoint.host)
            .map_err(|e| AppError::TransportFailed(e.to_string()))?
            .port(endpoint.port)
            .credentials(credentials)
            .authentication(vec![Mechanism::Login, Mechanism::Plain])
            .build();

        let recipient = message
            .envelope()
            .to()
            .first()
            .map(|a| a.to_string())
            .unwrap_or_default();

        let response = transport
            .send(message)
            .map_err(|e| classify_smtp_error(&e))?;

        Ok(SendReceipt::new(
            recipient,
            u16::from(response.code()),
            response.first_line().unwrap_or_default(),
        ))
    }
}

/// Maps a lettre failure onto the dispatch error kinds.
pub(crate) fn classify_smtp_error(err: &lettre::transport::smtp::Error) -> AppError {
    let text = err.to_string();
    if let Some(code) = err.status() {
        return classify_reply(u16::from(code), text);
    }
    if err.is_client() {
        if text.to_ascii_lowercase().contains("authentication") {
            return AppError::AuthenticationFailed(text);
        }
        return AppError::DeliveryFailed {
            code: None,
            message: text,
        };
    }
    AppError::TransportFailed(text)
}

pub(crate) fn classify_reply(code: u16, message: String) -> AppError {
    if AUTH_REJECTION_CODES.contains(&code) {
        AppError::AuthenticationFailed(message)
    } else {
        AppError::DeliveryFailed {
            code: Some(code),
            message,
        }
    }
}

pub struct SmtpDispatcher {
    connector: Box<dyn SmtpConnector>,
}

impl Default for SmtpDispatcher {
    fn default() -> Self {
        Self::new(Box::new(LettreConnector))
    }
}

impl SmtpDispatcher {
    pub fn new(connector: Box<dyn SmtpConnector>) -> Self {
        SmtpDispatcher { connector }
    }

    /// Sends one plain-text message from `config.email` to `to`.
    ///
    /// Input problems are reported before any connection is attempted.
    pub fn send(
        &self,
        config: &Configuration,
        to: &str,
        subject: &str,
        body: &str,
    ) -> Result<SendReceipt> {
        let password = config
            .app_password
            .as_ref()
            .filter(|p| !p.expose_secret().is_empty())
            .ok_or_else(|| {
                AppError::ConfigurationIncomplete("No app password configured".to_string())
            })?;
        if config.email.is_empty() {
            return Err(AppError::ConfigurationIncomplete(
                "No sender address configured".to_string(),
            ));
        }
        if config.smtp_server.trim().is_empty() || config.smtp_port == 0 {
            return Err(AppError::ConfigurationIncomplete(
                "No SMTP server configured".to_string(),
            ));
        }

        let message = build_message(&config.email, to, subject, body)?;
        let endpoint = SmtpEndpoint {
            host: config.smtp_server.trim().to_string(),
            port: config.smtp_port,
        };
        let credentials =
            Credentials::new(config.email.clone(), password.expose_secret().clone());

        tracing::info!(target: "smtp_dispatch", "Sending to {} via {}", to.trim(), endpoint);
        match self.connector.deliver(&endpoint, credentials, &message) {
            Ok(receipt) => {
                tracing::info!(target: "smtp_dispatch", "Message accepted: {}", receipt);
                Ok(receipt)
            }
            Err(e) => {
                tracing::error!(target: "smtp_dispatch", "Send via {} failed: {}", endpoint, e);
                Err(e)
            }
        }
    }
}

/// Builds the plain-text message. Rejects a recipient without `@`, an
/// unparsable address, and an empty subject or body.
pub(crate) fn build_message(from: &str, to: &str, subject: &str, body: &str) -> Result<Message> {
    let to = to.trim();
    if to.is_empty() || !to.contains('@') {
        return Err(AppError::Validation(format!(
            "Recipient '{}' is not a valid email address",
            to
        )));
    }
    let to_mailbox: Mailbox = to
        .parse()
        .map_err(|e| AppError::Validation(format!("Recipient '{}': {}", to, e)))?;
    let from_mailbox: Mailbox = from
        .parse()
        .map_err(|e| AppError::Validation(format!("Sender '{}': {}", from, e)))?;
    if subject.trim().is_empty() {
        return Err(AppError::Validation("Subject must not be empty".to_string()));
    }
    if body.is_empty() {
        return Err(AppError::Validation("Message body must not be empty".to_string()));
    }

    Message::builder()
        .from(from_mailbox)
        .to(to_mailbox)
        .subject(subject)
        .header(ContentType::TEXT_PLAIN)
        .body(body.to_string())
        .map_err(|e| AppError::Validation(format!("Cannot build message: {}", e)))
}
