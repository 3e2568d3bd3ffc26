use log::{error, info};
use std::sync::Arc;
use std::time::Duration;

use super::{spawn_pump, MotionProvider, Subscription};
use crate::cache::SampleCache;

/// Pumps one motion channel into the cache. An unsupported channel is logged and
/// skipped; the other channels keep running.
pub fn subscribe_motion(
    provider: &dyn MotionProvider,
    channel: &str,
    interval: Duration,
    cache: Arc<SampleCache>,
) -> Option<Subscription> {
    let Some(updates) = provider.listen(channel, interval) else {
        error!("Sensor {} is not supported.", channel);
        return None;
    };

    info!("Listening to {} every {:?}", channel, interval);
    let name = channel.to_string();
    Some(spawn_pump(channel, updates, move |sample| {
        cache.update_motion(&name, sample)
    }))
}
