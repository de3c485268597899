//! Defines the result type for a successful dispatch.

/// What the server said when it accepted a message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReceipt {
    /// The single envelope recipient.
    pub recipient: String,
    /// SMTP reply code for the final DATA command (normally 250).
    pub code: u16,
    /// First line of the server's reply text.
    pub message: String,
}

impl SendReceipt {
    pub fn new(recipient: impl Into<String>, code: u16, message: impl Into<String>) -> Self {
        Self {
            recipient: recipient.into(),
            code,
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SendReceipt {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sent to {} ({} {})", self.recipient, self.code, self.message)
    }
}
