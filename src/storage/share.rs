use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use thiserror::Error;
use utoipa::ToSchema;

use super::{DatasetStore, DeviceId, StorageError};

#[derive(Debug, Error)]
pub enum ShareError {
    #[error("sharing is not available on this device")]
    Unavailable,
    #[error("failed to share recording: {0}")]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Host mechanism that takes an exported dataset off the device.
pub trait ShareTarget: Send + Sync {
    fn is_available(&self) -> bool;

    /// Hands `bytes` over under `file_name` and describes where they went.
    fn share(&self, file_name: &str, bytes: &[u8]) -> Result<String, ShareError>;
}

/// Drops exports into a directory that some other process picks up.
pub struct OutboxShare {
    dir: PathBuf,
}

impl OutboxShare {
    pub fn new(dir: PathBuf) -> Self {
        OutboxShare { dir }
    }
}

impl ShareTarget for OutboxShare {
    fn is_available(&self) -> bool {
        true
    }

    fn share(&self, file_name: &str, bytes: &[u8]) -> Result<String, ShareError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(file_name);
        fs::write(&path, bytes)?;
        Ok(path.display().to_string())
    }
}

/// Host without any share mechanism.
pub struct NoShare;

impl ShareTarget for NoShare {
    fn is_available(&self) -> bool {
        false
    }

    fn share(&self, _file_name: &str, _bytes: &[u8]) -> Result<String, ShareError> {
        Err(ShareError::Unavailable)
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ExportReceipt {
    pub device_id: String,
    pub bytes: usize,
    pub destination: String,
}

pub fn export_dataset(
    store: &DatasetStore,
    device: &DeviceId,
    target: &dyn ShareTarget,
) -> Result<ExportReceipt, ShareError> {
    if !target.is_available() {
        return Err(ShareError::Unavailable);
    }

    let bytes = store.export_bytes(device)?;
    let file_name = format!("{}_{}.json", device, Utc::now().format("%Y%m%dT%H%M%SZ"));
    let destination = target.share(&file_name, &bytes)?;
    log::info!("Shared {} bytes of {} to {}", bytes.len(), device, destination);

    Ok(ExportReceipt {
        device_id: device.to_string(),
        bytes: bytes.len(),
        destination,
    })
}
