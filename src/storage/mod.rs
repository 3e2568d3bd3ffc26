mod dataset;
mod device;
mod share;

use thiserror::Error;

pub use dataset::DatasetStore;
pub use device::DeviceId;
pub use share::{export_dataset, ExportReceipt, NoShare, OutboxShare, ShareError, ShareTarget};

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid device id: {0:?}")]
    InvalidDeviceId(String),
}
