use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;

use super::ingest::Ingestor;
use super::scanner::scan;
use crate::config::Config;
use crate::feed::{FeedPublisher, FeedSettings};
use crate::storage::CatalogStore;

/// Counters for one import batch.
///
/// `failed` includes the `inconsistent` tasks.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub imported: usize,
    pub failed: usize,
    pub inconsistent: usize,
    pub skipped_after_cancel: usize,
    pub feeds_published: usize,
    pub feeds_failed: usize,
}

/// One pass over the pull directory followed by feed regeneration.
pub struct ImportJob {
    pull_dir: PathBuf,
    ingestor: Ingestor,
    publisher: FeedPublisher,
    feed_concurrency: usize,
}

impl ImportJob {
    pub fn new(store: Arc<dyn CatalogStore>, config: &Config) -> Self {
        let ingestor = Ingestor::new(
            store.clone(),
            config.podcast_dir.clone(),
            config.io_timeout(),
        );
        let publisher = FeedPublisher::new(
            store,
            config.podcast_dir.clone(),
            FeedSettings::with_static_content_url(config.static_content_url.clone()),
        );
        Self {
            pull_dir: config.pull_dir.clone(),
            ingestor,
            publisher,
            feed_concurrency: config.feed_concurrency.max(1),
        }
    }

    pub fn publisher(&self) -> &FeedPublisher {
        &self.publisher
    }

    /// Imports every pending task, then rebuilds the feeds they touched.
    ///
    /// Tasks run one at a time in scan order so ordinals follow publish
    /// dates. Cancellation is checked between tasks only; the remaining
    /// tasks are left in place and counted as skipped. Feeds for already
    /// imported episodes are still regenerated after a cancel.
    pub async fn run_batch(&self, cancel: &CancellationToken) -> Result<BatchReport> {
        let tasks = scan(&self.pull_dir).await.with_context(|| {
            format!("Failed to scan pull directory {}", self.pull_dir.display())
        })?;

        let mut report = BatchReport::default();
        if tasks.is_empty() {
            tracing::debug!(pull_dir = %self.pull_dir.display(), "No import tasks");
            return Ok(report);
        }

        let mut touched = BTreeSet::new();
        for (index, task) in tasks.iter().enumerate() {
            if cancel.is_cancelled() {
                report.skipped_after_cancel = tasks.len() - index;
                tracing::info!(
                    remaining = report.skipped_after_cancel,
                    "Import cancelled, leaving remaining tasks for next run"
                );
                break;
            }

            match self.ingestor.ingest(task).await {
                Ok(ingested) => {
                    report.imported += 1;
                    touched.insert(ingested.podcast_id);
                }
                Err(e) => {
                    report.failed += 1;
                    if e.is_inconsistent() {
                        report.inconsistent += 1;
                        tracing::error!(
                            title = %task.manifest.title,
                            dir = %task.base_dir.display(),
                            error = %e,
                            "Import left an unavailable episode behind"
                        );
                    } else {
                        tracing::warn!(
                            title = %task.manifest.title,
                            dir = %task.base_dir.display(),
                            error = %e,
                            "Import task failed"
                        );
                    }
                }
            }
        }

        tracing::info!(
            imported = report.imported,
            failed = report.failed,
            inconsistent = report.inconsistent,
            skipped = report.skipped_after_cancel,
            "Import tasks finished"
        );

        if touched.is_empty() {
            tracing::info!("No podcasts need a feed refresh");
            return Ok(report);
        }

        let (published, failed) = self.regenerate(touched).await;
        report.feeds_published = published;
        report.feeds_failed = failed;
        tracing::info!(
            published = report.feeds_published,
            failed = report.feeds_failed,
            "Feed refresh finished"
        );
        Ok(report)
    }

    /// Republishes the given podcasts concurrently; returns
    /// `(published, failed)`.
    pub async fn regenerate(&self, podcast_ids: impl IntoIterator<Item = i64>) -> (usize, usize) {
        let results: Vec<bool> = stream::iter(podcast_ids)
            .map(|podcast_id| {
                let publisher = self.publisher.clone();
                async move {
                    match publisher.publish(podcast_id).await {
                        Ok(_) => true,
                        Err(e) => {
                            tracing::warn!(podcast_id, error = %e, "Feed refresh failed");
                            false
                        }
                    }
                }
            })
            .buffer_unordered(self.feed_concurrency)
            .collect()
            .await;

        let published = results.iter().filter(|ok| **ok).count();
        (published, results.len() - published)
    }
}
