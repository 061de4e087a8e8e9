use std::sync::Arc;
use std::time::Duration;

use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::job::ImportJob;

/// Runs [`ImportJob`] batches on a fixed interval.
pub struct ImportScheduler {
    job: Arc<ImportJob>,
    interval: Duration,
    cancel: CancellationToken,
}

/// Handle to a running scheduler loop.
pub struct SchedulerHandle {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ImportScheduler {
    pub fn new(job: ImportJob, interval: Duration) -> Self {
        Self {
            job: Arc::new(job),
            interval,
            cancel: CancellationToken::new(),
        }
    }

    /// Spawns the loop. The first batch starts right away, later ones every
    /// `interval` after the previous start (delayed if a batch overruns).
    pub fn start(self) -> SchedulerHandle {
        let cancel = self.cancel.clone();
        let task = tokio::spawn(run_loop(self.job, self.interval, self.cancel));
        SchedulerHandle { cancel, task }
    }
}

async fn run_loop(job: Arc<ImportJob>, interval: Duration, cancel: CancellationToken) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tracing::info!(interval_secs = interval.as_secs(), "Import scheduler started");

    loop {
        tokio::select! {
            biased;

            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        match job.run_batch(&cancel).await {
            Ok(report) => tracing::debug!(?report, "Import batch complete"),
            Err(e) => tracing::error!(error = %e, "Import batch failed"),
        }
    }

    tracing::info!("Import scheduler stopped");
}

impl SchedulerHandle {
    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stops the loop and waits for it to exit.
    ///
    /// A batch already in progress finishes its current task and the feed
    /// regenerations for what it imported; no new task is started.
    pub async fn shutdown(self) -> Result<(), JoinError> {
        self.cancel.cancel();
        self.task.await
    }
}
