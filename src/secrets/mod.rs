//! Credential vault abstraction.
//!
//! A [`SecretStore`] maps `(service, account)` to one opaque secret string.
//! Backends are chosen once at startup through [`VaultBackend`].

pub(crate) mod encrypted_file;
pub(crate) mod memory;
pub(crate) mod os_vault;

pub use encrypted_file::EncryptedFileVault;
pub use memory::MemoryVault;
pub use os_vault::OsVault;

use secrecy::SecretString;
use std::path::PathBuf;
use thiserror::Error;

/// Failure reported by a vault backend.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SecretStoreError {
    /// No backend is reachable at all (no keyring daemon, no storage access).
    #[error("credential backend unavailable: {0}")]
    Unavailable(String),

    /// The backend is present but the operation failed.
    #[error("credential backend error: {0}")]
    Backend(String),
}

/// Capability set every vault variant provides.
pub trait SecretStore: Send + Sync {
    /// Returns `Ok(None)` when no secret is stored for the key.
    fn get(
        &self,
        service: &str,
        account: &str,
    ) -> Result<Option<SecretString>, SecretStoreError>;

    fn set(
        &self,
        service: &str,
        account: &str,
        secret: &SecretString,
    ) -> Result<(), SecretStoreError>;

    /// Short label used in log lines.
    fn backend_name(&self) -> &'static str;
}

impl<T: SecretStore + ?Sized> SecretStore for std::sync::Arc<T> {
    fn get(
        &self,
        service: &str,
        account: &str,
    ) -> Result<Option<SecretString>, SecretStoreError> {
        (**self).get(service, account)
    }

    fn set(
        &self,
        service: &str,
        account: &str,
        secret: &SecretString,
    ) -> Result<(), SecretStoreError> {
        (**self).set(service, account, secret)
    }

    fn backend_name(&self) -> &'static str {
        (**self).backend_name()
    }
}

/// Startup selection of the vault variant.
#[derive(Debug, Clone)]
pub enum VaultBackend {
    /// Platform keychain / secret service / credential manager.
    Os,
    /// Passphrase-encrypted file on disk.
    EncryptedFile {
        path: PathBuf,
        passphrase: SecretString,
    },
    /// Process-local map; contents vanish at exit.
    Memory,
}

impl VaultBackend {
    pub fn open(self) -> Box<dyn SecretStore> {
        let store: Box<dyn SecretStore> = match self {
            VaultBackend::Os => Box::new(OsVault::new()),
            VaultBackend::EncryptedFile { path, passphrase } => {
                Box::new(EncryptedFileVault::new(path, passphrase))
            }
            VaultBackend::Memory => Box::new(MemoryVault::new()),
        };
        tracing::debug!(target: "vault", "Using {} credential backend", store.backend_name());
        store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    #[test]
    fn memory_backend_opens_and_round_trips() {
        let store = VaultBackend::Memory.open();
        assert_eq!(store.backend_name(), "memory");
        store
            .set("svc", "a@example.com", &SecretString::new("pw".into()))
            .unwrap();
        let got = store.get("svc", "a@example.com").unwrap().unwrap();
        assert_eq!(got.expose_secret(), "pw");
    }
}
