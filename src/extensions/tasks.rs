//! In-process background task queue.
//!
//! Jobs run on the Tokio runtime, at most `TASK_QUEUE_WORKERS` at a time.
//! With `TASK_ALWAYS_EAGER` the job runs to completion inside `enqueue`.
//! Failures are logged; nothing is retried.

use std::future::Future;
use std::sync::Arc;
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::config::Settings;
use crate::error::{AppError, InitError};

#[derive(Debug, Clone)]
pub struct TaskQueue {
    eager: bool,
    workers: usize,
    slots: Arc<Semaphore>,
}

impl TaskQueue {
    pub fn config_from_settings(settings: &Settings) -> Result<Self, InitError> {
        let workers = settings.get_u64("TASK_QUEUE_WORKERS")?.unwrap_or(4);
        let workers = usize::try_from(workers).unwrap_or(usize::MAX);
        if workers == 0 {
            return Err(InitError::extension("task_queue", "TASK_QUEUE_WORKERS must be at least 1"));
        }
        if workers > Semaphore::MAX_PERMITS {
            return Err(InitError::extension(
                "task_queue",
                format!("TASK_QUEUE_WORKERS must not exceed {}", Semaphore::MAX_PERMITS),
            ));
        }
        Ok(TaskQueue {
            eager: settings.get_bool("TASK_ALWAYS_EAGER"),
            workers,
            slots: Arc::new(Semaphore::new(workers)),
        })
    }

    pub fn eager(&self) -> bool {
        self.eager
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Schedules a background job.
    ///
    /// # Arguments
    ///
    /// * `name` - Label used in the job's log lines.
    /// * `job` - The work to run. An `Err` is logged and not retried.
    ///
    /// # Returns
    ///
    /// * `Uuid` - The job id. In eager mode the job has already finished.
    pub async fn enqueue<F>(&self, name: &'static str, job: F) -> Uuid
    where
        F: Future<Output = Result<(), AppError>> + Send + 'static,
    {
        let id = Uuid::new_v4();
        if self.eager {
            run(name, id, job).await;
            return id;
        }

        let slots = self.slots.clone();
        tokio::spawn(async move {
            let _permit = match slots.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    log::error!("task {} [{}]: queue closed", name, id);
                    return;
                }
            };
            run(name, id, job).await;
        });
        id
    }
}

async fn run<F>(name: &'static str, id: Uuid, job: F)
where
    F: Future<Output = Result<(), AppError>>,
{
    log::debug!("task {} [{}]: started", name, id);
    match job.await {
        Ok(()) => log::debug!("task {} [{}]: done", name, id),
        Err(e) => log::error!("task {} [{}]: failed: {}", name, id, e),
    }
}
