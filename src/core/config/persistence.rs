//! Reads and writes the non-secret settings file.

use super::file::SettingsFile;
use crate::core::error::{AppError, Result};
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

const APP_DIR: &str = "quick-mailer";
const SETTINGS_FILE_NAME: &str = "settings.toml";

/// Outcome of reading the settings file.
#[derive(Debug)]
pub enum SettingsRead {
    /// No file yet; a normal first-run state.
    Missing,
    Loaded(SettingsFile),
    /// The file exists but could not be parsed.
    Malformed(String),
}

/// File-backed persistence for [`SettingsFile`].
#[derive(Debug, Clone)]
pub struct SettingsStore {
    path: PathBuf,
}

impl SettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        SettingsStore { path: path.into() }
    }

    /// `<config dir>/quick-mailer/settings.toml`, falling back to the working
    /// directory when the platform reports no config dir.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .map(|dir| dir.join(APP_DIR))
            .unwrap_or_else(|| PathBuf::from("."))
            .join(SETTINGS_FILE_NAME)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the settings file. Only I/O failures other than "not found" are
    /// returned as errors.
    pub fn read(&self) -> Result<SettingsRead> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(SettingsRead::Missing),
            Err(e) => {
                return Err(AppError::Persistence(format!(
                    "Cannot read '{}': {}",
                    self.path.display(),
                    e
                )))
            }
        };

        let legacy = SettingsFile::legacy_secret_keys(&text);
        if !legacy.is_empty() {
            tracing::warn!(
                target: "config",
                "Settings file '{}' contains legacy secret keys {:?}; they are ignored and will be removed on the next save",
                self.path.display(),
                legacy
            );
        }

        match SettingsFile::parse(&text) {
            Ok(parsed) => Ok(SettingsRead::Loaded(parsed)),
            Err(e) => Ok(SettingsRead::Malformed(e.to_string())),
        }
    }

    /// Writes the settings atomically: a sibling temp file is written, synced,
    /// then renamed over the target.
    pub fn write(&self, settings: &SettingsFile) -> Result<()> {
        let text = toml::to_string_pretty(settings)
            .map_err(|e| AppError::Persistence(format!("Cannot encode settings: {}", e)))?;
        self.write_text(&text).map_err(|e| {
            AppError::Persistence(format!("Cannot write '{}': {}", self.path.display(), e))
        })?;
        tracing::debug!(target: "config", "Settings written to {}", self.path.display());
        Ok(())
    }

    fn write_text(&self, text: &str) -> io::Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("toml.tmp");
        {
            let mut tmp = fs::File::create(&tmp_path)?;
            tmp.write_all(text.as_bytes())?;
            tmp.sync_all()?;
        }
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> SettingsFile {
        SettingsFile {
            email: Some("a@example.com".into()),
            smtp_server: Some("smtp.example.com".into()),
            smtp_port: Some(465),
            check_recipient_domain: Some(true),
        }
    }

    #[test]
    fn missing_file_is_not_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("settings.toml"));
        assert!(matches!(store.read().unwrap(), SettingsRead::Missing));
    }

    #[test]
    fn write_creates_parent_dirs_and_reads_back() {
        let dir = tempfile::tempdir().unwrap();
        let store = SettingsStore::new(dir.path().join("nested/deeper/settings.toml"));
        store.write(&sample()).unwrap();
        match store.read().unwrap() {
            SettingsRead::Loaded(parsed) => assert_eq!(parsed, sample()),
            other => panic!("unexpected read result: {:?}", other),
        }
        assert!(!dir.path().join("nested/deeper/settings.toml.tmp").exists());
    }

    #[test]
    fn malformed_file_is_reported_not_raised() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "email = [unterminated").unwrap();
        let store = SettingsStore::new(&path);
        assert!(matches!(store.read().unwrap(), SettingsRead::Malformed(_)));
    }

    #[test]
    fn unwritable_location_is_a_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        fs::write(&blocker, "x").unwrap();
        let store = SettingsStore::new(blocker.join("settings.toml"));
        assert!(matches!(store.write(&sample()), Err(AppError::Persistence(_))));
    }
}
