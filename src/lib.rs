//! Core of quick-mailer: one account's settings, the credential vault that
//! holds its app password, an optional recipient domain check, and SMTP
//! dispatch.
//!
//! A presentation layer drives four synchronous entry points:
//! [`ConfigManager::load`], [`ConfigManager::save`], [`SmtpDispatcher::send`]
//! and [`DomainValidator::check_domain_validity`].

pub mod core;
pub mod dispatch;
pub mod secrets;
pub mod verification;
pub mod worker;

pub use crate::core::config::{
    AccountState, ConfigManager, Configuration, SettingsFile, SettingsStore, DEFAULT_SMTP_PORT,
    DEFAULT_SMTP_SERVER, SERVICE_NAME,
};
pub use crate::core::error::{AppError, Result};
pub use dispatch::{LettreConnector, SendReceipt, SmtpConnector, SmtpDispatcher, SmtpEndpoint};
pub use secrets::{
    EncryptedFileVault, MemoryVault, OsVault, SecretStore, SecretStoreError, VaultBackend,
};
pub use verification::{DnsLookup, DomainValidator, LookupOutcome, MissingMxPolicy};
pub use worker::OutgoingMessage;
