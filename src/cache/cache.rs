use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use utoipa::ToSchema;

use super::samples::{LocationSample, MotionSample};

/// Copy of every channel at one instant. Channels that never reported are absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct CacheSnapshot {
    pub location: Option<LocationSample>,
    pub motion: BTreeMap<String, MotionSample>,
}

/// Latest-value store shared between producers and the sampling clock.
///
/// Every update replaces a whole slot under the lock, so a snapshot sees either the
/// previous value or the new one for each channel, never a mix. The lock is only
/// held for the copy.
#[derive(Debug, Default)]
pub struct SampleCache {
    slots: Mutex<CacheSnapshot>,
}

impl SampleCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update_location(&self, sample: LocationSample) {
        self.slots().location = Some(sample);
    }

    pub fn update_motion(&self, channel: &str, sample: MotionSample) {
        let mut slots = self.slots();
        match slots.motion.get_mut(channel) {
            Some(slot) => *slot = sample,
            None => {
                slots.motion.insert(channel.to_string(), sample);
            }
        }
    }

    pub fn snapshot(&self) -> CacheSnapshot {
        self.slots().clone()
    }

    fn slots(&self) -> MutexGuard<'_, CacheSnapshot> {
        // Slots are assigned in a single statement, so a poisoned lock still holds whole values.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }
}
