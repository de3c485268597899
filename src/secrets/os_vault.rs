//! Platform credential store through the `keyring` crate.

use super::{SecretStore, SecretStoreError};
use keyring::Entry;
use secrecy::{ExposeSecret, SecretString};

#[derive(Debug, Default, Clone, Copy)]
pub struct OsVault;

impl OsVault {
    pub fn new() -> Self {
        OsVault
    }
}

fn map_keyring_error(err: keyring::Error) -> SecretStoreError {
    match err {
        keyring::Error::NoStorageAccess(_) | keyring::Error::PlatformFailure(_) => {
            SecretStoreError::Unavailable(err.to_string())
        }
        other => SecretStoreError::Backend(other.to_string()),
    }
}

impl SecretStore for OsVault {
    fn get(
        &self,
        service: &str,
        account: &str,
    ) -> Result<Option<SecretString>, SecretStoreError> {
        let entry = Entry::new(service, account).map_err(map_keyring_error)?;
        match entry.get_password() {
            Ok(secret) => Ok(Some(SecretString::new(secret))),
            Err(keyring::Error::NoEntry) => {
                tracing::debug!(target: "vault", "No keyring entry for account {}", account);
                Ok(None)
            }
            Err(e) => Err(map_keyring_error(e)),
        }
    }

    fn set(
        &self,
        service: &str,
        account: &str,
        secret: &SecretString,
    ) -> Result<(), SecretStoreError> {
        let entry = Entry::new(service, account).map_err(map_keyring_error)?;
        entry
            .set_password(secret.expose_secret())
            .map_err(map_keyring_error)
    }

    fn backend_name(&self) -> &'static str {
        "os-keyring"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_absence_maps_to_unavailable() {
        let err = map_keyring_error(keyring::Error::NoStorageAccess("locked".into()));
        assert!(matches!(err, SecretStoreError::Unavailable(_)));
        let err = map_keyring_error(keyring::Error::PlatformFailure("no dbus".into()));
        assert!(matches!(err, SecretStoreError::Unavailable(_)));
    }

    #[test]
    fn other_errors_map_to_backend() {
        let err = map_keyring_error(keyring::Error::TooLong("service".into(), 32));
        assert!(matches!(err, SecretStoreError::Backend(_)));
    }
}
