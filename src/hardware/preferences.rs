use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
    sync::Mutex,
};

use tracing::debug;

use crate::Error;

#[cfg(test)]
#[path = "preferences_tests.rs"]
mod preferences_tests;

/// Defines a persistent store for integer values keyed by name.
///
/// The store is shared between the wheel modules, so the methods take a shared reference
/// and implementations provide their own synchronization.
pub trait PreferenceStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if nothing has been stored.
    fn get_int(&self, key: &str) -> Result<Option<i64>, Error>;

    /// Stores `value` under `key`, replacing any previous value.
    fn put_int(&self, key: &str, value: i64) -> Result<(), Error>;
}

/// Defines a [PreferenceStore] that keeps the values in memory only.
#[derive(Debug, Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<BTreeMap<String, i64>>,
}

impl MemoryPreferenceStore {
    /// Creates a new, empty [MemoryPreferenceStore].
    pub fn new() -> Self {
        Self::default()
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get_int(&self, key: &str) -> Result<Option<i64>, Error> {
        let map = self.values.lock().unwrap_or_else(|err| err.into_inner());
        Ok(map.get(key).copied())
    }

    fn put_int(&self, key: &str, value: i64) -> Result<(), Error> {
        let mut map = self.values.lock().unwrap_or_else(|err| err.into_inner());
        map.insert(key.to_string(), value);
        Ok(())
    }
}

/// Defines a [PreferenceStore] that persists the values as a JSON object in a file, so
/// that they survive a power cycle.
///
/// The file is read when the store is opened and replaced on every put. A put writes the
/// new contents to a sibling file and renames it over the backing file, so a failed put
/// leaves both the file and the stored values unchanged.
#[derive(Debug)]
pub struct JsonFilePreferenceStore {
    path: PathBuf,
    values: Mutex<BTreeMap<String, i64>>,
}

impl JsonFilePreferenceStore {
    /// Opens the store at the given path. A missing file results in an empty store.
    ///
    /// ## Errors
    ///
    /// * [Error::Persistence] - Returned when the file exists but cannot be read or parsed.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let text = fs::read_to_string(&path).map_err(|e| Error::Persistence {
                reason: format!("failed to read '{}': {}", path.display(), e),
            })?;
            serde_json::from_str(&text).map_err(|e| Error::Persistence {
                reason: format!("failed to parse '{}': {}", path.display(), e),
            })?
        } else {
            BTreeMap::new()
        };

        debug!(
            "Opened preference store '{}' with {} entries",
            path.display(),
            values.len()
        );

        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    /// Returns the path of the backing file.
    pub fn path(&self) -> &Path {
        self.path.as_ref()
    }

    /// Returns the path of the file that a put writes before it replaces the backing file.
    ///
    /// The file sits next to the backing file so that the rename stays on one file system.
    fn staging_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl PreferenceStore for JsonFilePreferenceStore {
    fn get_int(&self, key: &str) -> Result<Option<i64>, Error> {
        let map = self.values.lock().unwrap_or_else(|err| err.into_inner());
        Ok(map.get(key).copied())
    }

    fn put_int(&self, key: &str, value: i64) -> Result<(), Error> {
        let mut map = self.values.lock().unwrap_or_else(|err| err.into_inner());
        let mut updated = map.clone();
        updated.insert(key.to_string(), value);

        let text = serde_json::to_string_pretty(&updated).map_err(|e| Error::Persistence {
            reason: format!("failed to serialize preferences: {}", e),
        })?;

        let staging = self.staging_path();
        fs::write(&staging, text).map_err(|e| Error::Persistence {
            reason: format!("failed to write '{}': {}", staging.display(), e),
        })?;
        if let Err(e) = fs::rename(&staging, &self.path) {
            let _ = fs::remove_file(&staging);
            return Err(Error::Persistence {
                reason: format!("failed to replace '{}': {}", self.path.display(), e),
            });
        }

        *map = updated;
        Ok(())
    }
}
