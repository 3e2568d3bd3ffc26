use thiserror::Error;

use crate::storage::{ShareError, StorageError};

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("already recording")]
    AlreadyRecording,
    #[error("not recording")]
    NotRecording,
    #[error("stop recording first: {operation} is not permitted while recording")]
    InvalidStateTransition { operation: &'static str },
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Share(#[from] ShareError),
}
