use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::settings::SettingsError;

/// JSON file holding the state of one bill between CLI invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionFile {
    path: PathBuf,
}

impl SessionFile {
    pub fn default_path() -> PathBuf {
        crate::config_dir().join("session.json")
    }

    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// `path`, or the default session location.
    pub fn at_or_default(path: Option<PathBuf>) -> Self {
        Self::new(path.unwrap_or_else(Self::default_path))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// `Ok(None)` when the file does not exist. A file that exists but does
    /// not parse is an error, never silently replaced.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Option<T>, SettingsError> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&contents)?))
    }

    /// Write through a sibling temp file and rename, so a crash never leaves
    /// half a session behind.
    pub fn save<T: Serialize>(&self, value: &T) -> Result<(), SettingsError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(value)?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        log::debug!("session saved to {}", self.path.display());
        Ok(())
    }

    /// Returns whether a file was removed.
    pub fn remove(&self) -> Result<bool, SettingsError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use tabsplit_core::Item;
    use tabsplit_split::{SessionState, TipBase};
    use tempfile::TempDir;

    #[test]
    fn missing_file_loads_none() {
        let dir = TempDir::new().unwrap();
        let file = SessionFile::new(dir.path().join("session.json"));
        let loaded: Option<SessionState> = file.load().unwrap();
        assert!(loaded.is_none());
        assert!(!file.remove().unwrap());
    }

    #[test]
    fn session_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let file = SessionFile::new(dir.path().join("bills").join("session.json"));

        let items = vec![Item::new("Burger", Decimal::new(1200, 2)).unwrap()];
        let id = items[0].id;
        let mut state = SessionState::with_items(items, TipBase::PreTax);
        state.assign("Ana", &[id], Decimal::from(8), Decimal::from(15)).unwrap();
        file.save(&state).unwrap();
        assert!(file.exists());
        assert!(!file.path().with_extension("json.tmp").exists());

        let loaded: SessionState = file.load().unwrap().unwrap();
        assert_eq!(loaded.tip_base(), TipBase::PreTax);
        assert_eq!(loaded.owner_of(id), Some("Ana"));
        assert_eq!(loaded.summarize("Ana").unwrap(), state.summarize("Ana").unwrap());

        assert!(file.remove().unwrap());
        assert!(!file.exists());
    }

    #[test]
    fn corrupt_session_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "[1, 2").unwrap();
        let err = SessionFile::new(&path).load::<SessionState>().unwrap_err();
        assert!(matches!(err, SettingsError::Json(_)));
    }

    #[test]
    fn default_path_lives_under_config_dir() {
        let file = SessionFile::at_or_default(None);
        assert!(file.path().ends_with("tabsplit/session.json"));
    }
}
