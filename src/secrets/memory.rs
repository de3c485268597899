//! In-memory vault for tests and throwaway sessions.

use super::{SecretStore, SecretStoreError};
use parking_lot::Mutex;
use secrecy::{ExposeSecret, SecretString};
use std::collections::HashMap;

#[derive(Default)]
pub struct MemoryVault {
    entries: Mutex<HashMap<(String, String), String>>,
    fail_writes: bool,
    unavailable: bool,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// A vault whose every `set` fails with a backend error.
    pub fn failing_writes() -> Self {
        MemoryVault {
            fail_writes: true,
            ..Self::default()
        }
    }

    /// A vault that behaves as if no credential backend were installed.
    pub fn unavailable() -> Self {
        MemoryVault {
            unavailable: true,
            ..Self::default()
        }
    }

    /// Seeds an entry directly, bypassing failure injection.
    pub fn insert(&self, service: &str, account: &str, secret: &str) {
        self.entries
            .lock()
            .insert((service.to_string(), account.to_string()), secret.to_string());
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecretStore for MemoryVault {
    fn get(
        &self,
        service: &str,
        account: &str,
    ) -> Result<Option<SecretString>, SecretStoreError> {
        if self.unavailable {
            return Err(SecretStoreError::Unavailable("memory vault disabled".into()));
        }
        Ok(self
            .entries
            .lock()
            .get(&(service.to_string(), account.to_string()))
            .map(|s| SecretString::new(s.clone())))
    }

    fn set(
        &self,
        service: &str,
        account: &str,
        secret: &SecretString,
    ) -> Result<(), SecretStoreError> {
        if self.unavailable {
            return Err(SecretStoreError::Unavailable("memory vault disabled".into()));
        }
        if self.fail_writes {
            return Err(SecretStoreError::Backend("write rejected".into()));
        }
        self.entries.lock().insert(
            (service.to_string(), account.to_string()),
            secret.expose_secret().clone(),
        );
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_entry_is_none() {
        let vault = MemoryVault::new();
        assert!(vault.get("svc", "nobody@example.com").unwrap().is_none());
    }

    #[test]
    fn keys_are_scoped_by_service_and_account() {
        let vault = MemoryVault::new();
        vault.insert("svc", "a@example.com", "one");
        assert!(vault.get("other", "a@example.com").unwrap().is_none());
        assert!(vault.get("svc", "b@example.com").unwrap().is_none());
        assert_eq!(
            vault.get("svc", "a@example.com").unwrap().unwrap().expose_secret(),
            "one"
        );
    }

    #[test]
    fn injected_failures() {
        let secret = SecretString::new("pw".into());
        assert!(matches!(
            MemoryVault::failing_writes().set("svc", "a", &secret),
            Err(SecretStoreError::Backend(_))
        ));
        assert!(matches!(
            MemoryVault::unavailable().get("svc", "a"),
            Err(SecretStoreError::Unavailable(_))
        ));
    }
}
