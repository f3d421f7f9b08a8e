//! Named periodic background tasks.
//!
//! Each task runs on its own tokio task with an interval timer. The first
//! run happens one period after scheduling. Missed ticks are skipped, not
//! replayed. Cancelling stops the task before its next tick.

use abia_core::error::{AbiaError, Result};
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Body of a periodic task. Called once per tick.
pub type Job = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

struct ScheduledTask {
    token: CancellationToken,
    handle: JoinHandle<()>,
}

#[derive(Default)]
pub struct TaskScheduler {
    tasks: Mutex<HashMap<String, ScheduledTask>>,
}

impl TaskScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    fn tasks(&self) -> MutexGuard<'_, HashMap<String, ScheduledTask>> {
        self.tasks.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Runs `job` every `period` under `name`, replacing any task already
    /// registered with that name.
    ///
    /// Must be called from within a tokio runtime.
    ///
    /// # Errors
    ///
    /// A zero period is rejected.
    pub fn schedule_every<F>(&self, name: &str, period: Duration, job: F) -> Result<()>
    where
        F: Fn() -> BoxFuture<'static, ()> + Send + Sync + 'static,
    {
        if period.is_zero() {
            return Err(AbiaError::config(format!(
                "Task '{}' needs a non-zero period",
                name
            )));
        }

        let job: Job = Arc::new(job);
        let token = CancellationToken::new();
        let task_token = token.clone();
        let task_name = name.to_string();
        let start = Instant::now() + period;

        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(start, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => break,
                    _ = ticker.tick() => {
                        tracing::trace!("[Scheduler] Running task '{}'", task_name);
                        job().await;
                    }
                }
            }
            tracing::debug!("[Scheduler] Task '{}' stopped", task_name);
        });

        let previous = self
            .tasks()
            .insert(name.to_string(), ScheduledTask { token, handle });
        if let Some(previous) = previous {
            tracing::debug!("[Scheduler] Replacing task '{}'", name);
            previous.token.cancel();
        }
        tracing::info!("[Scheduler] Scheduled '{}' every {:?}", name, period);
        Ok(())
    }

    /// Stops a task. Returns whether it existed.
    pub fn cancel(&self, name: &str) -> bool {
        match self.tasks().remove(name) {
            Some(task) => {
                task.token.cancel();
                true
            }
            None => false,
        }
    }

    pub fn is_scheduled(&self, name: &str) -> bool {
        self.tasks().contains_key(name)
    }

    /// Names of the registered tasks, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tasks().keys().cloned().collect();
        names.sort();
        names
    }

    /// Cancels every task and waits for them to stop.
    pub async fn shutdown(&self) {
        let tasks: Vec<ScheduledTask> = self.tasks().drain().map(|(_, task)| task).collect();
        for task in &tasks {
            task.token.cancel();
        }
        for task in tasks {
            if let Err(e) = task.handle.await
                && e.is_panic()
            {
                tracing::error!("[Scheduler] Task panicked: {}", e);
            }
        }
    }
}

impl Drop for TaskScheduler {
    fn drop(&mut self) {
        for task in self.tasks().values() {
            task.token.cancel();
        }
    }
}
