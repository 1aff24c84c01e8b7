//! Small string key/value persistence for locale and organization choice.
//!
//! Plain keys, no schema version.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use crate::error::Error;

/// Persisted UI locale.
pub const LOCALE_KEY: &str = "locale";
/// Persisted current organization id.
pub const ORGANIZATION_KEY: &str = "currentOrganizationId";

pub trait PreferenceStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Option<String>;

    /// # Errors
    ///
    /// Returns [`Error::Preferences`] if the value could not be persisted.
    fn set(&self, key: &str, value: &str) -> Result<(), Error>;

    /// # Errors
    ///
    /// Returns [`Error::Preferences`] if the removal could not be persisted.
    fn remove(&self, key: &str) -> Result<(), Error>;
}

#[derive(Debug, Default)]
pub struct MemoryPreferences {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryPreferences {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

/// Preferences kept in one JSON object file, rewritten on every change.
#[derive(Debug)]
pub struct FilePreferences {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FilePreferences {
    /// Open `path`. A missing file starts empty; an unreadable or corrupt one
    /// starts empty too, with a warning, and is overwritten on the next write.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match std::fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
                tracing::warn!(path = %path.display(), error = %e, "Corrupt preferences file, using defaults");
                BTreeMap::new()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Unreadable preferences file, using defaults");
                BTreeMap::new()
            }
        };
        Self {
            path,
            values: Mutex::new(values),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, values: &BTreeMap<String, String>) -> Result<(), Error> {
        let json = serde_json::to_string_pretty(values)
            .map_err(|e| Error::Preferences(e.to_string()))?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|e| Error::Preferences(format!("{}: {e}", parent.display())))?;
        }
        std::fs::write(&self.path, json)
            .map_err(|e| Error::Preferences(format!("{}: {e}", self.path.display())))
    }
}

impl PreferenceStore for FilePreferences {
    fn get(&self, key: &str) -> Option<String> {
        self.values
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    // Memory only changes once the file write succeeded.
    fn set(&self, key: &str, value: &str) -> Result<(), Error> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        let mut next = values.clone();
        next.insert(key.to_owned(), value.to_owned());
        self.persist(&next)?;
        *values = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), Error> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        if !values.contains_key(key) {
            return Ok(());
        }
        let mut next = values.clone();
        next.remove(key);
        self.persist(&next)?;
        *values = next;
        Ok(())
    }
}
