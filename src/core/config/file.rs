//! Defines the structure mirroring the TOML settings file format.
//!
//! Only non-secret fields exist here, so the app password cannot reach the
//! settings file by construction.

use super::Configuration;
use serde::{Deserialize, Serialize};

/// Keys a legacy settings file may still carry. They are ignored on read and
/// dropped on the next write.
pub(crate) const LEGACY_SECRET_KEYS: &[&str] = &["app_password", "password"];

#[derive(Deserialize, Serialize, Debug, Default, Clone, PartialEq, Eq)]
pub struct SettingsFile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) smtp_server: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) smtp_port: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) check_recipient_domain: Option<bool>,
}

impl SettingsFile {
    /// Parses settings text. Unknown keys are ignored and missing keys stay
    /// `None` so the caller can fall back to defaults.
    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Returns the legacy secret keys present in raw settings text, if any.
    pub(crate) fn legacy_secret_keys(text: &str) -> Vec<&'static str> {
        let Ok(table) = text.parse::<toml::Table>() else {
            return Vec::new();
        };
        LEGACY_SECRET_KEYS
            .iter()
            .copied()
            .filter(|key| table.contains_key(*key))
            .collect()
    }

    /// Overlays the persisted fields onto `config`, leaving fields that are
    /// absent from the file untouched.
    pub(crate) fn merge_into(&self, config: &mut Configuration) {
        if let Some(ref email) = self.email {
            config.email = email.trim().to_string();
        }
        if let Some(ref server) = self.smtp_server {
            config.smtp_server = server.trim().to_string();
        }
        if let Some(port) = self.smtp_port {
            config.smtp_port = port;
        }
        if let Some(flag) = self.check_recipient_domain {
            config.check_recipient_domain = flag;
        }
    }
}

impl From<&Configuration> for SettingsFile {
    fn from(config: &Configuration) -> Self {
        SettingsFile {
            email: Some(config.email.clone()),
            smtp_server: Some(config.smtp_server.clone()),
            smtp_port: Some(config.smtp_port),
            check_recipient_domain: Some(config.check_recipient_domain),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_keys_are_ignored() {
        let parsed = SettingsFile::parse(
            "email = \"a@example.com\"\ntheme = \"dark\"\n[window]\nwidth = 600\n",
        )
        .unwrap();
        assert_eq!(parsed.email.as_deref(), Some("a@example.com"));
        assert_eq!(parsed.smtp_port, None);
    }

    #[test]
    fn merge_keeps_defaults_for_missing_keys() {
        let mut config = Configuration::with_defaults(true);
        let parsed = SettingsFile::parse("smtp_port = 2465\n").unwrap();
        parsed.merge_into(&mut config);
        assert_eq!(config.smtp_port, 2465);
        assert_eq!(config.smtp_server, super::super::DEFAULT_SMTP_SERVER);
        assert!(config.email.is_empty());
    }

    #[test]
    fn wrong_types_are_rejected() {
        assert!(SettingsFile::parse("smtp_port = \"465\"\n").is_err());
        assert!(SettingsFile::parse("smtp_port = 70000\n").is_err());
    }

    #[test]
    fn detects_legacy_password_key() {
        let text = "email = \"a@example.com\"\napp_password = \"hunter2\"\n";
        assert_eq!(SettingsFile::legacy_secret_keys(text), vec!["app_password"]);
        assert!(SettingsFile::legacy_secret_keys("email = \"x@y\"").is_empty());
    }
}
