//! Passphrase-encrypted vault file.
//!
//! - **Key derivation**: PBKDF2-HMAC-SHA256
//! - **Encryption**: AES-256-GCM with a random 96-bit nonce per write
//! - **Format**: JSON envelope with hex salt, nonce, and ciphertext; the
//!   plaintext is a JSON object keyed by `service/account`

use super::{SecretStore, SecretStoreError};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use parking_lot::Mutex;
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;

/// PBKDF2 iteration count (OWASP 2023 recommendation for SHA-256).
pub const DEFAULT_ITERATIONS: u32 = 600_000;
const SALT_LEN: usize = 32;
const NONCE_LEN: usize = 12;
const KEY_LEN: usize = 32;
const ENVELOPE_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct VaultEnvelope {
    version: u32,
    iterations: u32,
    salt: String,
    nonce: String,
    ciphertext: String,
}

pub struct EncryptedFileVault {
    path: PathBuf,
    passphrase: SecretString,
    iterations: u32,
    // Serializes read-modify-write cycles within this process.
    write_lock: Mutex<()>,
}

impl EncryptedFileVault {
    pub fn new(path: impl Into<PathBuf>, passphrase: SecretString) -> Self {
        EncryptedFileVault {
            path: path.into(),
            passphrase,
            iterations: DEFAULT_ITERATIONS,
            write_lock: Mutex::new(()),
        }
    }

    /// Overrides the PBKDF2 iteration count used for new writes. Existing
    /// files always decrypt with the count recorded in their envelope.
    pub fn with_iterations(mut self, iterations: u32) -> Self {
        self.iterations = iterations.max(1);
        self
    }

    fn entry_key(service: &str, account: &str) -> String {
        format!("{}/{}", service, account)
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>, SecretStoreError> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(BTreeMap::new()),
            Err(e) => {
                return Err(SecretStoreError::Unavailable(format!(
                    "cannot read vault file '{}': {}",
                    self.path.display(),
                    e
                )))
            }
        };
        let plaintext = decrypt(&text, self.passphrase.expose_secret())?;
        serde_json::from_str(&plaintext)
            .map_err(|e| SecretStoreError::Backend(format!("vault contents are corrupted: {}", e)))
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<(), SecretStoreError> {
        let plaintext = serde_json::to_string(entries)
            .map_err(|e| SecretStoreError::Backend(format!("cannot encode vault: {}", e)))?;
        let envelope = encrypt(&plaintext, self.passphrase.expose_secret(), self.iterations)?;

        let write = || -> io::Result<()> {
            if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
            let tmp_path = self.path.with_extension("vault.tmp");
            {
                let mut tmp = fs::File::create(&tmp_path)?;
                tmp.write_all(envelope.as_bytes())?;
                tmp.sync_all()?;
            }
            if let Err(e) = fs::rename(&tmp_path, &self.path) {
                let _ = fs::remove_file(&tmp_path);
                return Err(e);
            }
            Ok(())
        };
        write().map_err(|e| {
            SecretStoreError::Backend(format!(
                "cannot write vault file '{}': {}",
                self.path.display(),
                e
            ))
        })
    }
}

impl SecretStore for EncryptedFileVault {
    fn get(
        &self,
        service: &str,
        account: &str,
    ) -> Result<Option<SecretString>, SecretStoreError> {
        let entries = self.read_entries()?;
        Ok(entries
            .get(&Self::entry_key(service, account))
            .map(|s| SecretString::new(s.clone())))
    }

    fn set(
        &self,
        service: &str,
        account: &str,
        secret: &SecretString,
    ) -> Result<(), SecretStoreError> {
        let _guard = self.write_lock.lock();
        let mut entries = self.read_entries()?;
        entries.insert(
            Self::entry_key(service, account),
            secret.expose_secret().clone(),
        );
        self.write_entries(&entries)
    }

    fn backend_name(&self) -> &'static str {
        "encrypted-file"
    }
}

fn derive_key(passphrase: &str, salt: &[u8], iterations: u32) -> [u8; KEY_LEN] {
    let mut key = [0u8; KEY_LEN];
    pbkdf2::pbkdf2_hmac::<sha2::Sha256>(passphrase.as_bytes(), salt, iterations, &mut key);
    key
}

fn encrypt(plaintext: &str, passphrase: &str, iterations: u32) -> Result<String, SecretStoreError> {
    let mut salt = [0u8; SALT_LEN];
    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    rand::thread_rng().fill_bytes(&mut nonce);

    let key = derive_key(passphrase, &salt, iterations);
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| SecretStoreError::Backend(format!("AES init: {}", e)))?;
    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext.as_bytes())
        .map_err(|e| SecretStoreError::Backend(format!("AES encrypt: {}", e)))?;

    let envelope = VaultEnvelope {
        version: ENVELOPE_VERSION,
        iterations,
        salt: hex::encode(salt),
        nonce: hex::encode(nonce),
        ciphertext: hex::encode(ciphertext),
    };
    serde_json::to_string_pretty(&envelope)
        .map_err(|e| SecretStoreError::Backend(format!("cannot encode envelope: {}", e)))
}

fn decrypt(envelope_json: &str, passphrase: &str) -> Result<String, SecretStoreError> {
    fn bad(what: &str, e: impl std::fmt::Display) -> SecretStoreError {
        SecretStoreError::Backend(format!("invalid vault file ({}): {}", what, e))
    }
    let envelope: VaultEnvelope =
        serde_json::from_str(envelope_json).map_err(|e| bad("envelope", e))?;
    if envelope.version != ENVELOPE_VERSION {
        return Err(SecretStoreError::Backend(format!(
            "unsupported vault version {}",
            envelope.version
        )));
    }
    let salt = hex::decode(&envelope.salt).map_err(|e| bad("salt", e))?;
    let nonce = hex::decode(&envelope.nonce).map_err(|e| bad("nonce", e))?;
    let ciphertext = hex::decode(&envelope.ciphertext).map_err(|e| bad("ciphertext", e))?;
    if nonce.len() != NONCE_LEN {
        return Err(SecretStoreError::Backend(format!(
            "nonce length {} != expected {}",
            nonce.len(),
            NONCE_LEN
        )));
    }

    let key = derive_key(passphrase, &salt, envelope.iterations);
    let cipher = Aes256Gcm::new_from_slice(&key)
        .map_err(|e| SecretStoreError::Backend(format!("AES init: {}", e)))?;
    let plaintext = cipher
        .decrypt(Nonce::from_slice(&nonce), ciphertext.as_slice())
        .map_err(|_| {
            SecretStoreError::Backend("decryption failed: wrong passphrase or corrupted file".into())
        })?;
    String::from_utf8(plaintext).map_err(|e| bad("utf-8", e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    fn vault(path: &Path, passphrase: &str) -> EncryptedFileVault {
        EncryptedFileVault::new(path, SecretString::new(passphrase.into())).with_iterations(1_000)
    }

    #[test]
    fn absent_file_has_no_entries() {
        let dir = tempfile::tempdir().unwrap();
        let store = vault(&dir.path().join("vault.json"), "pass");
        assert!(store.get("svc", "a@example.com").unwrap().is_none());
    }

    #[test]
    fn stores_multiple_accounts_without_plaintext_on_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        let store = vault(&path, "pass");
        store
            .set("svc", "a@example.com", &SecretString::new("abcd-efgh-ijkl".into()))
            .unwrap();
        store
            .set("svc", "b@example.com", &SecretString::new("mnop-qrst".into()))
            .unwrap();

        let reopened = vault(&path, "pass");
        assert_eq!(
            reopened.get("svc", "a@example.com").unwrap().unwrap().expose_secret(),
            "abcd-efgh-ijkl"
        );
        assert_eq!(
            reopened.get("svc", "b@example.com").unwrap().unwrap().expose_secret(),
            "mnop-qrst"
        );

        let raw = fs::read_to_string(&path).unwrap();
        assert!(!raw.contains("abcd-efgh-ijkl"));
        assert!(!raw.contains("a@example.com"));
    }

    #[test]
    fn wrong_passphrase_is_a_backend_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        vault(&path, "right")
            .set("svc", "a@example.com", &SecretString::new("pw".into()))
            .unwrap();
        let err = vault(&path, "wrong").get("svc", "a@example.com").unwrap_err();
        assert!(matches!(err, SecretStoreError::Backend(ref m) if m.contains("wrong passphrase")));
    }

    #[test]
    fn overwrite_replaces_secret() {
        let dir = tempfile::tempdir().unwrap();
        let store = vault(&dir.path().join("vault.json"), "pass");
        store.set("svc", "a", &SecretString::new("old".into())).unwrap();
        store.set("svc", "a", &SecretString::new("new".into())).unwrap();
        assert_eq!(store.get("svc", "a").unwrap().unwrap().expose_secret(), "new");
    }

    #[test]
    fn write_leaves_no_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        vault(&path, "pass")
            .set("svc", "a", &SecretString::new("pw".into()))
            .unwrap();
        assert!(path.is_file());
        assert!(!path.with_extension("vault.tmp").exists());
    }

    #[test]
    fn failed_rename_removes_temp_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("vault.json");
        // A non-empty directory at the target makes the rename fail.
        fs::create_dir(&path).unwrap();
        fs::write(path.join("occupied"), "x").unwrap();

        let err = vault(&path, "pass").write_entries(&BTreeMap::new()).unwrap_err();
        assert!(matches!(err, SecretStoreError::Backend(ref m) if m.contains("cannot write vault file")));
        assert!(!path.with_extension("vault.tmp").exists());
    }
}
