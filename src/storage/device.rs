use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::Path;

use super::StorageError;

const DEVICE_ID_FILE: &str = "device_id";

/// Identifier a dataset is keyed by. Used verbatim as the dataset file stem, so it is
/// limited to characters that are safe in a file name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DeviceId(String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Result<Self, StorageError> {
        let id = id.into();
        let valid_chars = id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        if id.is_empty() || id.starts_with('.') || !valid_chars {
            return Err(StorageError::InvalidDeviceId(id));
        }
        Ok(DeviceId(id))
    }

    /// Reads the id persisted under `base`, generating and saving a fresh one on first use.
    pub fn load_or_create(base: &Path) -> Result<Self, StorageError> {
        let path = base.join(DEVICE_ID_FILE);
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            return DeviceId::new(content.trim());
        }

        fs::create_dir_all(base)?;
        let id = DeviceId(uuid::Uuid::new_v4().to_string());
        fs::write(&path, id.as_str())?;
        log::info!("Generated device id {} ({})", id, path.display());
        Ok(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for DeviceId {
    type Error = StorageError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        DeviceId::new(value)
    }
}

impl From<DeviceId> for String {
    fn from(id: DeviceId) -> Self {
        id.0
    }
}
