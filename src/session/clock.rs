use chrono::Utc;
use log::{debug, error};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, Instant};

use super::controller::Shared;
use super::record::CompositeRecord;
use super::ActivityType;
use crate::cache::SampleCache;
use crate::storage::{DatasetStore, DeviceId};

/// Everything a tick needs, handed to the clock when recording starts.
pub(super) struct TickContext {
    pub device: DeviceId,
    pub activity_type: ActivityType,
    pub cache: Arc<SampleCache>,
    pub period: Duration,
}

/// Fires every `period` from the moment it is spawned until `stop_rx` resolves,
/// queueing one record per tick for the writer.
pub(super) async fn run_clock(
    ctx: TickContext,
    shared: Arc<StdMutex<Shared>>,
    append_tx: mpsc::UnboundedSender<CompositeRecord>,
    mut stop_rx: oneshot::Receiver<()>,
) {
    let mut ticker = interval_at(Instant::now() + ctx.period, ctx.period);

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => break,
            _ = ticker.tick() => {}
        }

        let now = Utc::now();
        let record =
            CompositeRecord::assemble(ctx.cache.snapshot(), &ctx.device, ctx.activity_type, now);

        {
            let mut locked = shared.lock().unwrap_or_else(|e| e.into_inner());
            locked.status.ticks += 1;
            locked.status.last_tick_at = Some(now);
            debug!("Tick {} for {}", locked.status.ticks, ctx.device);
        }

        if append_tx.send(record).is_err() {
            error!("Dataset writer for {} is gone, stopping clock", ctx.device);
            break;
        }
    }
}

/// Drains queued records one at a time so appends never overlap.
///
/// A failed append is reported in the session status; the next record is still
/// attempted against a freshly read dataset.
pub(super) async fn run_writer(
    store: Arc<DatasetStore>,
    device: DeviceId,
    shared: Arc<StdMutex<Shared>>,
    mut append_rx: mpsc::UnboundedReceiver<CompositeRecord>,
) {
    while let Some(record) = append_rx.recv().await {
        let result = store.append(&device, &record);

        let mut locked = shared.lock().unwrap_or_else(|e| e.into_inner());
        match result {
            Ok(_) => locked.status.records_written += 1,
            Err(e) => {
                error!("Failed to store record for {}: {}", device, e);
                locked.status.failed_appends += 1;
                locked.status.last_error = Some(e.to_string());
            }
        }
    }
}
