use chrono::Utc;
use log::{error, info};
use std::sync::{Arc, Mutex as StdMutex, MutexGuard};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::clock::{run_clock, run_writer, TickContext};
use super::error::SessionError;
use super::record::CompositeRecord;
use super::types::{ActivityType, SessionMode, SessionStatus, StopSummary};
use crate::cache::{CacheSnapshot, SampleCache};
use crate::producer::Subscription;
use crate::storage::{export_dataset, DatasetStore, DeviceId, ExportReceipt, ShareTarget};

pub const DEFAULT_PERIOD: Duration = Duration::from_millis(1000);

#[derive(Debug)]
pub(super) struct Shared {
    pub status: SessionStatus,
}

#[derive(Debug)]
struct WorkerHandle {
    stop_tx: oneshot::Sender<()>,
    clock: JoinHandle<()>,
    writer: JoinHandle<()>,
}

/// Idle/Recording state machine that owns the sampling clock and the dataset writer.
///
/// Producer subscriptions attached here outlive individual recordings and are only
/// released by [`SessionController::shutdown`] or on drop.
pub struct SessionController {
    device: DeviceId,
    period: Duration,
    cache: Arc<SampleCache>,
    store: Arc<DatasetStore>,
    share: Arc<dyn ShareTarget>,
    shared: Arc<StdMutex<Shared>>,
    worker: Option<WorkerHandle>,
    subscriptions: Vec<Subscription>,
}

impl SessionController {
    pub fn new(
        device: DeviceId,
        cache: Arc<SampleCache>,
        store: Arc<DatasetStore>,
        share: Arc<dyn ShareTarget>,
    ) -> Self {
        let status = SessionStatus {
            mode: SessionMode::Idle,
            device_id: device.to_string(),
            activity_type: ActivityType::default(),
            ticks: 0,
            records_written: 0,
            failed_appends: 0,
            last_tick_at: None,
            last_error: None,
            active_producers: 0,
        };
        Self {
            device,
            period: DEFAULT_PERIOD,
            cache,
            store,
            share,
            shared: Arc::new(StdMutex::new(Shared { status })),
            worker: None,
            subscriptions: Vec::new(),
        }
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }

    pub fn device_id(&self) -> &DeviceId {
        &self.device
    }

    pub fn cache(&self) -> &Arc<SampleCache> {
        &self.cache
    }

    pub fn status(&self) -> SessionStatus {
        let mut status = self.shared().status.clone();
        status.active_producers = self.subscriptions.iter().filter(|s| s.is_active()).count();
        status
    }

    pub fn is_recording(&self) -> bool {
        self.worker.is_some()
    }

    pub fn latest_samples(&self) -> CacheSnapshot {
        self.cache.snapshot()
    }

    /// Keeps a producer subscription alive for the lifetime of this controller.
    pub fn attach(&mut self, subscription: Subscription) {
        self.subscriptions.push(subscription);
    }

    pub fn subscriptions(&self) -> &[Subscription] {
        &self.subscriptions
    }

    pub fn start(&mut self) -> Result<SessionStatus, SessionError> {
        if self.worker.is_some() {
            return Err(SessionError::AlreadyRecording);
        }

        let activity_type = {
            let mut locked = self.shared();
            locked.status.mode = SessionMode::Recording {
                started_at: Utc::now(),
            };
            locked.status.ticks = 0;
            locked.status.records_written = 0;
            locked.status.failed_appends = 0;
            locked.status.last_tick_at = None;
            locked.status.last_error = None;
            locked.status.activity_type
        };

        let ctx = TickContext {
            device: self.device.clone(),
            activity_type,
            cache: self.cache.clone(),
            period: self.period,
        };
        let (stop_tx, stop_rx) = oneshot::channel();
        let (append_tx, append_rx) = mpsc::unbounded_channel();

        let writer = tokio::spawn(run_writer(
            self.store.clone(),
            self.device.clone(),
            self.shared.clone(),
            append_rx,
        ));
        let clock = tokio::spawn(run_clock(ctx, self.shared.clone(), append_tx, stop_rx));

        self.worker = Some(WorkerHandle {
            stop_tx,
            clock,
            writer,
        });

        info!(
            "Recording started for {} ({}, every {:?})",
            self.device, activity_type, self.period
        );
        Ok(self.status())
    }

    /// Cancels future ticks, lets every queued append finish, then reads the dataset
    /// back for confirmation.
    pub async fn stop(&mut self) -> Result<StopSummary, SessionError> {
        let worker = self.worker.take().ok_or(SessionError::NotRecording)?;

        let _ = worker.stop_tx.send(());
        if let Err(e) = worker.clock.await {
            error!("Sampling clock for {} ended abnormally: {}", self.device, e);
        }
        // The clock owned the only sender, so the writer exits once the queue is empty.
        if let Err(e) = worker.writer.await {
            error!("Dataset writer for {} ended abnormally: {}", self.device, e);
        }

        let (ticks, records_written) = {
            let mut locked = self.shared();
            locked.status.mode = SessionMode::Idle;
            (locked.status.ticks, locked.status.records_written)
        };

        let dataset_path = self.store.dataset_path(&self.device);
        let dataset_len = match self.store.read_all(&self.device) {
            Ok(records) => {
                info!(
                    "Recording stopped, {} records saved in {}",
                    records.len(),
                    dataset_path.display()
                );
                Some(records.len())
            }
            Err(e) => {
                error!("Failed to read data from {}: {}", dataset_path.display(), e);
                None
            }
        };

        Ok(StopSummary {
            ticks,
            records_written,
            dataset_len,
            dataset_path: dataset_path.display().to_string(),
        })
    }

    pub fn set_activity_type(
        &mut self,
        activity_type: ActivityType,
    ) -> Result<SessionStatus, SessionError> {
        if self.is_recording() {
            return Err(SessionError::InvalidStateTransition {
                operation: "changing the activity type",
            });
        }
        self.shared().status.activity_type = activity_type;
        info!("Activity type set to {}", activity_type);
        Ok(self.status())
    }

    /// Every record stored for this device, oldest first.
    pub fn read_dataset(&self) -> Result<Vec<CompositeRecord>, SessionError> {
        Ok(self.store.read_all(&self.device)?)
    }

    pub fn reset_dataset(&mut self) -> Result<(), SessionError> {
        if self.is_recording() {
            return Err(SessionError::InvalidStateTransition {
                operation: "clearing the dataset",
            });
        }
        self.store.reset(&self.device)?;
        info!("Dataset for {} cleared", self.device);
        Ok(())
    }

    pub fn export(&self) -> Result<ExportReceipt, SessionError> {
        if self.is_recording() {
            return Err(SessionError::InvalidStateTransition {
                operation: "sharing the dataset",
            });
        }
        Ok(export_dataset(&self.store, &self.device, self.share.as_ref())?)
    }

    /// Stops any active recording and releases every producer subscription.
    pub async fn shutdown(&mut self) {
        if self.is_recording() {
            if let Err(e) = self.stop().await {
                error!("Failed to stop recording during shutdown: {}", e);
            }
        }
        for subscription in self.subscriptions.drain(..) {
            subscription.cancel();
        }
    }

    fn shared(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl Drop for SessionController {
    fn drop(&mut self) {
        if let Some(worker) = self.worker.take() {
            let _ = worker.stop_tx.send(());
        }
        for subscription in &self.subscriptions {
            subscription.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{LocationSample, MotionSample, ACCELEROMETER};
    use crate::storage::{NoShare, OutboxShare, ShareError};
    use tokio::time::sleep;

    struct Fixture {
        _dir: tempfile::TempDir,
        store: Arc<DatasetStore>,
        controller: SessionController,
    }

    fn fixture() -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(DatasetStore::new(dir.path().to_path_buf()));
        let controller = SessionController::new(
            DeviceId::new("dev1").unwrap(),
            Arc::new(SampleCache::new()),
            store.clone(),
            Arc::new(NoShare),
        );
        Fixture {
            _dir: dir,
            store,
            controller,
        }
    }

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_single_tick() {
        let Fixture {
            _dir,
            store,
            mut controller,
        } = fixture();
        let device = controller.device_id().clone();

        controller.start().unwrap();
        controller
            .cache()
            .update_location(LocationSample::new(1.0, 2.0));
        controller
            .cache()
            .update_motion(ACCELEROMETER, MotionSample::new(0.1, 0.2, 9.8));

        sleep(ms(1010)).await;
        let summary = controller.stop().await.unwrap();
        assert_eq!(summary.ticks, 1);
        assert_eq!(summary.dataset_len, Some(1));

        let records = store.read_all(&device).unwrap();
        assert_eq!(records.len(), 1);
        let record = &records[0];
        let location = record.location.unwrap();
        assert_eq!(location.latitude, 1.0);
        assert_eq!(location.longitude, 2.0);
        assert_eq!(
            record.sensor_data[ACCELEROMETER],
            MotionSample::new(0.1, 0.2, 9.8)
        );
        assert_eq!(record.activity_type, ActivityType::Walk);
        assert_eq!(record.device_id, "dev1");

        controller.reset_dataset().unwrap();
        assert!(controller.read_dataset().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_no_tick_before_first_period() {
        let Fixture {
            _dir,
            store,
            mut controller,
        } = fixture();

        controller.start().unwrap();
        sleep(ms(990)).await;
        let summary = controller.stop().await.unwrap();

        assert_eq!(summary.ticks, 0);
        assert!(store.read_all(controller.device_id()).unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_tick_sees_latest_update() {
        let Fixture {
            _dir,
            store,
            mut controller,
        } = fixture();
        let cache = controller.cache().clone();

        controller.start().unwrap();
        cache.update_motion(ACCELEROMETER, MotionSample::new(1.0, 1.0, 1.0));
        sleep(ms(500)).await;
        cache.update_motion(ACCELEROMETER, MotionSample::new(2.0, 2.0, 2.0));
        sleep(ms(600)).await;
        // tick 1 at 1000ms has fired; nothing new before tick 2
        sleep(ms(1000)).await;
        cache.update_motion(ACCELEROMETER, MotionSample::new(3.0, 3.0, 3.0));
        sleep(ms(1000)).await;
        controller.stop().await.unwrap();

        let xs: Vec<f64> = store
            .read_all(controller.device_id())
            .unwrap()
            .iter()
            .map(|r| r.sensor_data[ACCELEROMETER].x)
            .collect();
        assert_eq!(xs, vec![2.0, 2.0, 3.0]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_channels_are_absent() {
        let Fixture {
            _dir,
            store,
            mut controller,
        } = fixture();

        controller.start().unwrap();
        sleep(ms(1010)).await;
        controller.stop().await.unwrap();

        let records = store.read_all(controller.device_id()).unwrap();
        assert_eq!(records.len(), 1);
        assert!(records[0].location.is_none());
        assert!(records[0].sensor_data.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_double_start_keeps_single_clock() {
        let Fixture {
            _dir,
            store,
            mut controller,
        } = fixture();

        controller.start().unwrap();
        sleep(ms(400)).await;
        assert!(matches!(
            controller.start(),
            Err(SessionError::AlreadyRecording)
        ));
        sleep(ms(3100)).await;
        let summary = controller.stop().await.unwrap();

        assert_eq!(summary.ticks, 3);
        assert_eq!(store.read_all(controller.device_id()).unwrap().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_activity_locked_while_recording() {
        let Fixture {
            _dir,
            store,
            mut controller,
        } = fixture();

        controller.set_activity_type(ActivityType::Bus).unwrap();
        controller.start().unwrap();

        let result = controller.set_activity_type(ActivityType::Metro);
        assert!(matches!(
            result,
            Err(SessionError::InvalidStateTransition { .. })
        ));
        assert_eq!(controller.status().activity_type, ActivityType::Bus);

        sleep(ms(1010)).await;
        controller.stop().await.unwrap();

        let records = store.read_all(controller.device_id()).unwrap();
        assert_eq!(records[0].activity_type, ActivityType::Bus);
        controller.set_activity_type(ActivityType::Metro).unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_cancels_future_ticks() {
        let Fixture {
            _dir,
            store,
            mut controller,
        } = fixture();

        controller.start().unwrap();
        sleep(ms(2010)).await;
        controller.stop().await.unwrap();
        sleep(ms(5000)).await;

        assert_eq!(store.read_all(controller.device_id()).unwrap().len(), 2);
        assert_eq!(controller.status().mode, SessionMode::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sessions_append_to_same_dataset() {
        let Fixture {
            _dir,
            store,
            mut controller,
        } = fixture();

        for _ in 0..2 {
            controller.start().unwrap();
            sleep(ms(2010)).await;
            controller.stop().await.unwrap();
        }

        let records = store.read_all(controller.device_id()).unwrap();
        assert_eq!(records.len(), 4);
        assert!(records
            .windows(2)
            .all(|pair| pair[0].timestamp <= pair[1].timestamp));
    }

    #[tokio::test]
    async fn test_stop_when_idle_is_rejected() {
        let Fixture {
            _dir,
            store: _,
            mut controller,
        } = fixture();
        assert!(matches!(
            controller.stop().await,
            Err(SessionError::NotRecording)
        ));
    }

    #[tokio::test]
    async fn test_reset_and_export_require_idle() {
        let Fixture {
            _dir,
            store: _,
            mut controller,
        } = fixture();

        controller.start().unwrap();
        assert!(matches!(
            controller.reset_dataset(),
            Err(SessionError::InvalidStateTransition { .. })
        ));
        assert!(matches!(
            controller.export(),
            Err(SessionError::InvalidStateTransition { .. })
        ));
        controller.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_export_unavailable_is_surfaced() {
        let Fixture {
            _dir,
            store: _,
            controller,
        } = fixture();

        let result = controller.export();
        assert!(matches!(
            result,
            Err(SessionError::Share(ShareError::Unavailable))
        ));
        assert!(!controller.is_recording());
    }

    #[tokio::test]
    async fn test_export_to_outbox() {
        let dir = tempfile::tempdir().unwrap();
        let outbox = tempfile::tempdir().unwrap();
        let store = Arc::new(DatasetStore::new(dir.path().to_path_buf()));
        let controller = SessionController::new(
            DeviceId::new("dev1").unwrap(),
            Arc::new(SampleCache::new()),
            store,
            Arc::new(OutboxShare::new(outbox.path().to_path_buf())),
        );

        let receipt = controller.export().unwrap();
        assert_eq!(receipt.device_id, "dev1");
        assert_eq!(std::fs::read(receipt.destination).unwrap(), b"[]");
    }

    #[tokio::test(start_paused = true)]
    async fn test_write_failure_keeps_clock_running() {
        let dir = tempfile::tempdir().unwrap();
        // A plain file where the data folder should be makes every write fail.
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, b"").unwrap();
        let mut controller = SessionController::new(
            DeviceId::new("dev1").unwrap(),
            Arc::new(SampleCache::new()),
            Arc::new(DatasetStore::new(blocked)),
            Arc::new(NoShare),
        );

        controller.start().unwrap();
        sleep(ms(3010)).await;
        let status = controller.status();
        assert!(status.mode.is_recording());
        assert_eq!(status.ticks, 3);

        let summary = controller.stop().await.unwrap();
        let status = controller.status();
        assert_eq!(summary.records_written, 0);
        assert_eq!(status.failed_appends, 3);
        assert!(status.last_error.is_some());
    }
}
