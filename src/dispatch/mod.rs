//! Builds and transmits one plain-text message per call.

pub(crate) mod result;
pub(crate) mod smtp;

pub use result::SendReceipt;
pub use smtp::{LettreConnector, SmtpConnector, SmtpDispatcher, SmtpEndpoint};
