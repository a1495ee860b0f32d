//! Supervisor for background units of work.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::FutureExt;
use tokio::task::JoinHandle;
use tracing::{debug, error};
use uuid::Uuid;

/// Owns every spawned background execution until it completes.
///
/// Each unit of work is registered under its job id and removed when it
/// finishes, so a triggering request going away never discards the work
/// it scheduled. Panics inside a unit are caught and logged rather than
/// taking the registry entry down silently.
#[derive(Clone, Default)]
pub struct Supervisor {
    tasks: Arc<Mutex<HashMap<Uuid, JoinHandle<()>>>>,
}

impl Supervisor {
    /// Create an empty supervisor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn a unit of work owned by this supervisor.
    pub fn spawn<F>(&self, id: Uuid, work: F)
    where
        F: std::future::Future<Output = ()> + Send + 'static,
    {
        let tasks = self.tasks.clone();
        let handle = tokio::spawn(async move {
            if let Err(panic) = std::panic::AssertUnwindSafe(work).catch_unwind().await {
                let detail = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "non-string panic payload".to_string());
                error!(job_id = %id, panic = %detail, "Background task panicked");
            }
            tasks.lock().unwrap().remove(&id);
            debug!(job_id = %id, "Background task finished");
        });

        let mut tasks = self.tasks.lock().unwrap();
        if !handle.is_finished() {
            tasks.insert(id, handle);
        }
    }

    /// Number of units still in flight.
    pub fn active(&self) -> usize {
        let mut tasks = self.tasks.lock().unwrap();
        tasks.retain(|_, handle| !handle.is_finished());
        tasks.len()
    }

    /// Wait until every owned unit has finished.
    pub async fn wait_idle(&self) {
        while self.active() > 0 {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_spawned_work_runs_to_completion() {
        let supervisor = Supervisor::new();
        let counter = Arc::new(AtomicU32::new(0));

        for _ in 0..5 {
            let counter = counter.clone();
            supervisor.spawn(Uuid::new_v4(), async move {
                tokio::time::sleep(Duration::from_millis(5)).await;
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }

        supervisor.wait_idle().await;
        assert_eq!(counter.load(Ordering::SeqCst), 5);
        assert_eq!(supervisor.active(), 0);
    }

    #[tokio::test]
    async fn test_panicking_work_is_reaped() {
        let supervisor = Supervisor::new();
        supervisor.spawn(Uuid::new_v4(), async {
            panic!("deliberate test panic");
        });

        supervisor.wait_idle().await;
        assert_eq!(supervisor.active(), 0);
    }

    #[tokio::test]
    async fn test_active_counts_in_flight_work() {
        let supervisor = Supervisor::new();
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();

        supervisor.spawn(Uuid::new_v4(), async move {
            let _ = rx.await;
        });

        assert_eq!(supervisor.active(), 1);
        tx.send(()).unwrap();
        supervisor.wait_idle().await;
        assert_eq!(supervisor.active(), 0);
    }
}
