//! Owns the account [`Configuration`] and keeps the settings file and the
//! credential vault in step with it.

use super::file::SettingsFile;
use super::persistence::{SettingsRead, SettingsStore};
use super::{AccountState, Configuration, SERVICE_NAME};
use crate::core::error::{AppError, Result};
use crate::secrets::{SecretStore, SecretStoreError};
use secrecy::{ExposeSecret, SecretString};

pub struct ConfigManager {
    config: Configuration,
    settings: SettingsStore,
    vault: Box<dyn SecretStore>,
    dns_available: bool,
}

impl ConfigManager {
    /// Creates a manager holding default settings. Nothing is read until
    /// [`ConfigManager::load`] runs.
    pub fn new(settings: SettingsStore, vault: Box<dyn SecretStore>, dns_available: bool) -> Self {
        ConfigManager {
            config: Configuration::with_defaults(dns_available),
            settings,
            vault,
            dns_available,
        }
    }

    pub fn config(&self) -> &Configuration {
        &self.config
    }

    pub fn state(&self) -> AccountState {
        self.config.state()
    }

    pub fn settings_path(&self) -> &std::path::Path {
        self.settings.path()
    }

    /// Resets to defaults, merges the settings file, then looks up the secret.
    ///
    /// A missing or malformed settings file leaves the defaults in place. A
    /// missing vault entry leaves `app_password` absent. Only an unreachable
    /// vault backend is returned as an error; in that case the merged
    /// non-secret fields are kept. Performs no writes.
    pub fn load(&mut self) -> Result<()> {
        let mut merged = Configuration::with_defaults(self.dns_available);

        match self.settings.read() {
            Ok(SettingsRead::Loaded(file)) => {
                file.merge_into(&mut merged);
                tracing::info!(
                    target: "config",
                    "Loaded settings from {}",
                    self.settings.path().display()
                );
            }
            Ok(SettingsRead::Missing) => {
                tracing::info!(
                    target: "config",
                    "No settings file at {}, using defaults",
                    self.settings.path().display()
                );
            }
            Ok(SettingsRead::Malformed(reason)) => {
                tracing::warn!(
                    target: "config",
                    "Settings file {} is malformed ({}), using defaults",
                    self.settings.path().display(),
                    reason
                );
            }
            Err(e) => {
                tracing::warn!(target: "config", "{}, using defaults", e);
            }
        }

        if !self.dns_available {
            merged.check_recipient_domain = false;
        }

        if merged.email.is_empty() {
            self.config = merged;
            return Ok(());
        }

        let lookup = self.vault.get(SERVICE_NAME, &merged.email);
        match lookup {
            Ok(Some(secret)) => {
                tracing::debug!(
                    target: "vault",
                    "Found app password for {} in {}",
                    merged.email,
                    self.vault.backend_name()
                );
                merged.app_password = Some(secret);
                self.config = merged;
                Ok(())
            }
            Ok(None) => {
                tracing::info!(
                    target: "vault",
                    "No app password stored for {}",
                    merged.email
                );
                self.config = merged;
                Ok(())
            }
            Err(e) => {
                self.config = merged;
                Err(AppError::VaultUnavailable(e.to_string()))
            }
        }
    }

    /// Validates and persists new settings: settings file first, then the
    /// vault. The in-memory record changes only when both writes succeed.
    ///
    /// A vault failure after the file write is reported as
    /// [`AppError::VaultWriteFailed`]; the file then already holds the new
    /// values and the caller has to repeat `save`.
    pub fn save(
        &mut self,
        email: &str,
        app_password: SecretString,
        smtp_server: &str,
        smtp_port: u16,
        check_domain: bool,
    ) -> Result<()> {
        let email = email.trim();
        let smtp_server = smtp_server.trim();
        validate_account(email, &app_password, smtp_server, smtp_port)?;

        let mut updated = Configuration {
            email: email.to_string(),
            app_password: None,
            smtp_server: smtp_server.to_string(),
            smtp_port,
            check_recipient_domain: check_domain,
        };

        self.settings.write(&SettingsFile::from(&updated))?;

        self.vault
            .set(SERVICE_NAME, email, &app_password)
            .map_err(|e| {
                tracing::error!(
                    target: "vault",
                    "Settings for {} were written but the app password was not stored: {}",
                    email,
                    e
                );
                match e {
                    SecretStoreError::Unavailable(msg) | SecretStoreError::Backend(msg) => {
                        AppError::VaultWriteFailed(msg)
                    }
                }
            })?;

        updated.app_password = Some(app_password);
        if !self.dns_available {
            updated.check_recipient_domain = false;
        }
        self.config = updated;
        tracing::info!(target: "config", "Configuration saved for {}", email);
        Ok(())
    }
}

fn validate_account(
    email: &str,
    app_password: &SecretString,
    smtp_server: &str,
    smtp_port: u16,
) -> Result<()> {
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "Email address must be non-empty and contain '@'".to_string(),
        ));
    }
    if app_password.expose_secret().is_empty() {
        return Err(AppError::Validation("App password must not be empty".to_string()));
    }
    if smtp_server.is_empty() {
        return Err(AppError::Validation("SMTP server must not be empty".to_string()));
    }
    if smtp_port == 0 {
        return Err(AppError::Validation("SMTP port must not be 0".to_string()));
    }
    Ok(())
}
