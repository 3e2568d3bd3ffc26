//! Adapters between external sample streams and the [`SampleCache`].
//!
//! Providers stand in for the host's location service and motion sensors. Each stream
//! is pumped into the cache by its own task and controlled through a [`Subscription`].

mod location;
mod motion;
mod push;
mod simulated;
mod subscription;

use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

use crate::cache::{LocationSample, MotionSample, SampleCache};

pub use location::subscribe_location;
pub use motion::subscribe_motion;
pub use push::{PushError, PushHub};
pub use simulated::{SimulatedLocation, SimulatedMotion};
pub use subscription::{spawn_pump, Subscription};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accuracy {
    Lowest,
    Low,
    Balanced,
    High,
    Highest,
    #[default]
    BestForNavigation,
}

/// Requested cadence of position updates. Providers treat these as targets only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WatchOptions {
    pub accuracy: Accuracy,
    pub time_interval: Duration,
    pub distance_interval_m: f64,
}

impl Default for WatchOptions {
    fn default() -> Self {
        WatchOptions {
            accuracy: Accuracy::BestForNavigation,
            time_interval: Duration::from_millis(400),
            distance_interval_m: 0.1,
        }
    }
}

pub trait LocationProvider: Send + Sync {
    fn request_foreground_permission(&self) -> PermissionStatus;

    fn watch_position(&self, options: &WatchOptions) -> mpsc::Receiver<LocationSample>;
}

pub trait MotionProvider: Send + Sync {
    /// Starts a listener for `channel`, or `None` when no sensor backs it.
    fn listen(&self, channel: &str, interval: Duration) -> Option<mpsc::Receiver<MotionSample>>;
}

/// Subscribes the location watcher and every requested motion channel. Channels that
/// cannot be served are skipped.
pub fn subscribe_all(
    location: &dyn LocationProvider,
    watch: &WatchOptions,
    motion: &dyn MotionProvider,
    channels: &[String],
    motion_interval: Duration,
    cache: &Arc<SampleCache>,
) -> Vec<Subscription> {
    let mut subscriptions = Vec::new();
    subscriptions.extend(subscribe_location(location, watch, cache.clone()));
    for channel in channels {
        subscriptions.extend(subscribe_motion(
            motion,
            channel,
            motion_interval,
            cache.clone(),
        ));
    }
    subscriptions
}
