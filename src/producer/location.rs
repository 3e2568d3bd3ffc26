use log::{info, warn};
use std::sync::Arc;

use super::{spawn_pump, LocationProvider, PermissionStatus, Subscription, WatchOptions};
use crate::cache::SampleCache;

/// Asks for location permission once and, if granted, pumps position fixes into the
/// cache. Returns `None` when permission is denied; records then carry no location.
pub fn subscribe_location(
    provider: &dyn LocationProvider,
    options: &WatchOptions,
    cache: Arc<SampleCache>,
) -> Option<Subscription> {
    if provider.request_foreground_permission() == PermissionStatus::Denied {
        warn!("Permission to access location was denied");
        return None;
    }

    let updates = provider.watch_position(options);
    info!(
        "Watching location ({:?}, every {:?} / {} m)",
        options.accuracy, options.time_interval, options.distance_interval_m
    );
    Some(spawn_pump("location", updates, move |sample| {
        cache.update_location(sample)
    }))
}
