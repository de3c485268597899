//! Defines the runtime `Configuration` record and its defaults.
//! Submodules handle the on-disk shape, persistence, and the manager that owns
//! the record.

pub(crate) mod file;
pub(crate) mod manager;
pub(crate) mod persistence;

pub use file::SettingsFile;
pub use manager::ConfigManager;
pub use persistence::{SettingsRead, SettingsStore};

use secrecy::{ExposeSecret, SecretString};

/// SMTP-over-TLS host used when nothing else is configured.
pub const DEFAULT_SMTP_SERVER: &str = "smtp.gmail.com";
/// Implicit-TLS submission port.
pub const DEFAULT_SMTP_PORT: u16 = 465;
/// Service identifier under which the app password is stored in the vault.
pub const SERVICE_NAME: &str = "quick-mailer";

/// One account's settings. Owned by [`ConfigManager`]; collaborators receive
/// it by reference.
#[derive(Clone)]
pub struct Configuration {
    pub email: String,
    pub app_password: Option<SecretString>,
    pub smtp_server: String,
    pub smtp_port: u16,
    pub check_recipient_domain: bool,
}

impl Configuration {
    /// Fresh record with documented defaults. The domain check defaults to
    /// whether DNS resolution is available at all.
    pub fn with_defaults(dns_available: bool) -> Self {
        Configuration {
            email: String::new(),
            app_password: None,
            smtp_server: DEFAULT_SMTP_SERVER.to_string(),
            smtp_port: DEFAULT_SMTP_PORT,
            check_recipient_domain: dns_available,
        }
    }

    pub fn has_password(&self) -> bool {
        self.app_password
            .as_ref()
            .is_some_and(|p| !p.expose_secret().is_empty())
    }

    pub fn state(&self) -> AccountState {
        if self.email.is_empty() {
            AccountState::NotConfigured
        } else if !self.has_password() {
            AccountState::ConfigLoadedNoSecret
        } else {
            AccountState::Ready
        }
    }
}

impl std::fmt::Debug for Configuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Configuration")
            .field("email", &self.email)
            .field(
                "app_password",
                &if self.has_password() { "[REDACTED]" } else { "<absent>" },
            )
            .field("smtp_server", &self.smtp_server)
            .field("smtp_port", &self.smtp_port)
            .field("check_recipient_domain", &self.check_recipient_domain)
            .finish()
    }
}

/// Where the account stands between startup and being able to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountState {
    NotConfigured,
    /// Address known, but the vault has no password for it.
    ConfigLoadedNoSecret,
    Ready,
}

impl std::fmt::Display for AccountState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            AccountState::NotConfigured => "not configured",
            AccountState::ConfigLoadedNoSecret => "configured, app password missing",
            AccountState::Ready => "ready",
        };
        f.write_str(label)
    }
}
