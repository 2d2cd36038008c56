mod session_cleanup;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{info, warn};

use crate::services::session::SessionRegistry;

pub use session_cleanup::evict_idle_sessions;

const SESSION_CLEANUP_SCHEDULE: &str = "0 * * * * *";

pub struct WorkerManager {
    scheduler: Mutex<JobScheduler>,
    sessions: Arc<SessionRegistry>,
    idle_timeout: Duration,
}

impl WorkerManager {
    pub async fn new(sessions: Arc<SessionRegistry>, idle_timeout: Duration) -> Result<Self, WorkerError> {
        let scheduler = JobScheduler::new().await?;
        Ok(Self {
            scheduler: Mutex::new(scheduler),
            sessions,
            idle_timeout,
        })
    }

    pub async fn start(&self) -> Result<(), WorkerError> {
        let scheduler = self.scheduler.lock().await;

        let sessions = Arc::clone(&self.sessions);
        let idle_timeout = self.idle_timeout;
        let job = Job::new_async(SESSION_CLEANUP_SCHEDULE, move |_uuid, _lock| {
            let sessions = Arc::clone(&sessions);
            Box::pin(async move {
                evict_idle_sessions(sessions, idle_timeout);
            })
        })?;
        scheduler.add(job).await?;
        info!(schedule = SESSION_CLEANUP_SCHEDULE, "Session cleanup worker scheduled");

        scheduler.start().await?;
        info!("All workers started");
        Ok(())
    }

    pub async fn stop(&self) {
        info!("Stopping workers...");

        let mut scheduler = self.scheduler.lock().await;
        if let Err(e) = scheduler.shutdown().await {
            warn!(error = %e, "Error shutting down scheduler");
        }
        info!("Workers stopped");
    }
}

#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] tokio_cron_scheduler::JobSchedulerError),
}
