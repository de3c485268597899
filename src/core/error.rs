//! Defines the custom error types for the quick-mailer core.

use thiserror::Error;

/// The primary error type returned by every core entry point.
#[derive(Error, Debug)]
pub enum AppError {
    /// No sender address or no app password is available at send time.
    #[error("Configuration Incomplete: {0}")]
    ConfigurationIncomplete(String),

    /// The settings file could not be read or written.
    #[error("Persistence Error: {0}")]
    Persistence(String),

    /// No usable credential backend is present.
    #[error("Credential Vault Unavailable: {0}")]
    VaultUnavailable(String),

    /// The secret could not be stored after the settings file was already
    /// written. Repeating `save` resolves the mismatch.
    #[error("Credential Vault Write Failed (settings were saved): {0}")]
    VaultWriteFailed(String),

    /// Malformed address or an empty required field.
    #[error("Validation Failed: {0}")]
    Validation(String),

    /// The SMTP server rejected the credentials.
    #[error("SMTP Authentication Failed: {0}")]
    AuthenticationFailed(String),

    /// Connect, TLS, or socket failure before the server gave a verdict.
    #[error("SMTP Transport Failed: {0}")]
    TransportFailed(String),

    /// The server answered with a failure reply that is not an auth rejection.
    #[error("SMTP Delivery Failed: Code={}, Message='{message}'", .code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
    DeliveryFailed {
        /// The SMTP status code, when the server sent one.
        code: Option<u16>,
        /// The message returned by the server or the client library.
        message: String,
    },

    /// A background task could not be joined.
    #[error("Task Execution Error: {0}")]
    Task(String),
}

impl AppError {
    /// True for the three SMTP-layer failure kinds surfaced by `send`.
    pub fn is_smtp_failure(&self) -> bool {
        matches!(
            self,
            AppError::AuthenticationFailed(_)
                | AppError::TransportFailed(_)
                | AppError::DeliveryFailed { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivery_failed_formats_code() {
        let err = AppError::DeliveryFailed {
            code: Some(550),
            message: "mailbox unavailable".into(),
        };
        assert_eq!(
            err.to_string(),
            "SMTP Delivery Failed: Code=550, Message='mailbox unavailable'"
        );

        let err = AppError::DeliveryFailed {
            code: None,
            message: "no reply".into(),
        };
        assert!(err.to_string().contains("Code=none"));
    }

    #[test]
    fn smtp_failures_are_classified() {
        assert!(AppError::AuthenticationFailed("x".into()).is_smtp_failure());
        assert!(AppError::TransportFailed("x".into()).is_smtp_failure());
        assert!(!AppError::Validation("x".into()).is_smtp_failure());
    }
}
