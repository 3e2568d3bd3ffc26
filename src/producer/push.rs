use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TrySendError};

use super::{LocationProvider, MotionProvider, PermissionStatus, WatchOptions};
use crate::cache::{LocationSample, MotionSample};

const CHANNEL_CAPACITY: usize = 64;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("location permission denied")]
    PermissionDenied,
    #[error("no active subscription for channel {0}")]
    NotSubscribed(String),
    #[error("channel {0} is not keeping up")]
    Backlogged(String),
}

/// Provider fed by samples that a remote device posts to the ingest API.
///
/// The sender decides the cadence, so requested intervals are only logged.
pub struct PushHub {
    location_permission: PermissionStatus,
    channels: Vec<String>,
    location_tx: Mutex<Option<mpsc::Sender<LocationSample>>>,
    motion_tx: Mutex<HashMap<String, mpsc::Sender<MotionSample>>>,
}

impl PushHub {
    pub fn new(location_granted: bool, channels: Vec<String>) -> Self {
        PushHub {
            location_permission: if location_granted {
                PermissionStatus::Granted
            } else {
                PermissionStatus::Denied
            },
            channels,
            location_tx: Mutex::new(None),
            motion_tx: Mutex::new(HashMap::new()),
        }
    }

    pub fn push_location(&self, sample: LocationSample) -> Result<(), PushError> {
        if self.location_permission == PermissionStatus::Denied {
            return Err(PushError::PermissionDenied);
        }
        let tx = self
            .location_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
            .ok_or_else(|| PushError::NotSubscribed("location".into()))?;
        forward(&tx, "location", sample)
    }

    pub fn push_motion(&self, channel: &str, sample: MotionSample) -> Result<(), PushError> {
        let tx = self
            .motion_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .get(channel)
            .cloned()
            .ok_or_else(|| PushError::NotSubscribed(channel.to_string()))?;
        forward(&tx, channel, sample)
    }
}

fn forward<T>(tx: &mpsc::Sender<T>, channel: &str, sample: T) -> Result<(), PushError> {
    tx.try_send(sample).map_err(|e| match e {
        TrySendError::Full(_) => PushError::Backlogged(channel.to_string()),
        TrySendError::Closed(_) => PushError::NotSubscribed(channel.to_string()),
    })
}

impl LocationProvider for PushHub {
    fn request_foreground_permission(&self) -> PermissionStatus {
        self.location_permission
    }

    fn watch_position(&self, options: &WatchOptions) -> mpsc::Receiver<LocationSample> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        log::debug!("Push location accepts fixes at sender cadence ({:?})", options);
        *self.location_tx.lock().unwrap_or_else(|e| e.into_inner()) = Some(tx);
        rx
    }
}

impl MotionProvider for PushHub {
    fn listen(&self, channel: &str, _interval: Duration) -> Option<mpsc::Receiver<MotionSample>> {
        if !self.channels.iter().any(|c| c == channel) {
            return None;
        }
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.motion_tx
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(channel.to_string(), tx);
        Some(rx)
    }
}
