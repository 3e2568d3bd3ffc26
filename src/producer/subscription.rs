use log::debug;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Handle on a running producer pump. Cancelling is idempotent and also happens on drop.
///
/// Once `cancel` returns the sink is never called again, even if the pump task is still
/// draining buffered updates on another worker thread.
#[derive(Debug)]
pub struct Subscription {
    name: String,
    cancelled: Arc<Mutex<bool>>,
    join: JoinHandle<()>,
}

impl Subscription {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_active(&self) -> bool {
        !*lock(&self.cancelled) && !self.join.is_finished()
    }

    pub fn cancel(&self) {
        let mut cancelled = lock(&self.cancelled);
        if !*cancelled {
            *cancelled = true;
            // Parked pumps only notice through abort.
            self.join.abort();
            debug!("Subscription {} cancelled", self.name);
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn lock(flag: &Mutex<bool>) -> std::sync::MutexGuard<'_, bool> {
    flag.lock().unwrap_or_else(|e| e.into_inner())
}

/// Forwards every update arriving on `updates` into `sink` until the stream ends or
/// the returned subscription is cancelled.
pub fn spawn_pump<T, F>(name: impl Into<String>, mut updates: mpsc::Receiver<T>, mut sink: F) -> Subscription
where
    T: Send + 'static,
    F: FnMut(T) + Send + 'static,
{
    let name = name.into();
    let task_name = name.clone();
    let cancelled = Arc::new(Mutex::new(false));
    let gate = cancelled.clone();
    let join = tokio::spawn(async move {
        while let Some(update) = updates.recv().await {
            // Held across the sink call so cancel waits for an in-flight update.
            let cancelled = lock(&gate);
            if *cancelled {
                break;
            }
            sink(update);
        }
        debug!("Producer {} stream ended", task_name);
    });

    Subscription {
        name,
        cancelled,
        join,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_pump_forwards_until_cancelled() {
        let (tx, rx) = mpsc::channel(8);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let subscription = spawn_pump("test", rx, move |v: u32| sink.lock().unwrap().push(v));

        tx.send(1).await.unwrap();
        tx.send(2).await.unwrap();
        tokio::task::yield_now().await;
        while seen.lock().unwrap().len() < 2 {
            tokio::task::yield_now().await;
        }
        assert!(subscription.is_active());

        subscription.cancel();
        subscription.cancel();
        assert!(!subscription.is_active());

        // The pump is gone, so the receiver was dropped with it.
        tokio::task::yield_now().await;
        let _ = tx.send(3).await;
        tokio::task::yield_now().await;
        assert_eq!(*seen.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn test_drop_cancels() {
        let (tx, rx) = mpsc::channel::<u32>(1);
        let subscription = spawn_pump("dropped", rx, |_| {});
        drop(subscription);

        // abort() has been requested; once the task is torn down the channel closes
        tx.closed().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_no_updates_after_cancel_while_draining() {
        for _ in 0..50 {
            let (tx, rx) = mpsc::channel(10_000);
            for i in 0..10_000u32 {
                tx.try_send(i).unwrap();
            }
            let applied = Arc::new(AtomicUsize::new(0));
            let counter = applied.clone();
            let subscription = spawn_pump("busy", rx, move |_: u32| {
                counter.fetch_add(1, Ordering::SeqCst);
            });

            while applied.load(Ordering::SeqCst) < 10 {
                tokio::task::yield_now().await;
            }
            subscription.cancel();
            let at_cancel = applied.load(Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(5)).await;
            assert_eq!(applied.load(Ordering::SeqCst), at_cancel);
            assert!(!subscription.is_active());
        }
    }
}
