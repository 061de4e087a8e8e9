use std::future::Future;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

use super::manifest::ManifestError;
use super::probe::{probe, ProbeError};
use super::scanner::ImportTask;
use crate::layout::EpisodeLayout;
use crate::storage::{CatalogStore, DatabaseError, Episode, NewEpisode};
use crate::util::fs::move_file;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid manifest: {0}")]
    Validation(#[from] ManifestError),

    #[error("No {entity} with key {key:?}")]
    NotFound { entity: &'static str, key: String },

    #[error("Audio probe failed: {0}")]
    Probe(#[from] ProbeError),

    #[error("Image file {path} is not readable: {source}")]
    MissingFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Catalog error: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Episode {episode_id} created but file transfer failed: {source}")]
    Transfer {
        episode_id: i64,
        #[source]
        source: io::Error,
    },

    #[error("Episode {episode_id} files moved but it could not be marked available: {source}")]
    Finalize {
        episode_id: i64,
        #[source]
        source: DatabaseError,
    },
}

impl ImportError {
    /// True when an episode row was left behind without being made
    /// available. These need an operator; they are never retried.
    pub fn is_inconsistent(&self) -> bool {
        matches!(self, Self::Transfer { .. } | Self::Finalize { .. })
    }
}

/// Outcome of a successful ingestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ingested {
    pub podcast_id: i64,
    pub episode: Episode,
}

/// Next free ordinal in a season: one past the highest, 1 when empty.
pub fn next_ordinal(existing: &[Episode]) -> i64 {
    existing.iter().map(|e| e.num).max().unwrap_or(0) + 1
}

/// Turns one import task into an available episode.
pub struct Ingestor {
    store: Arc<dyn CatalogStore>,
    podcast_dir: PathBuf,
    io_timeout: Duration,
}

impl Ingestor {
    pub fn new(store: Arc<dyn CatalogStore>, podcast_dir: PathBuf, io_timeout: Duration) -> Self {
        Self {
            store,
            podcast_dir,
            io_timeout,
        }
    }

    /// Runs the ingestion steps in order, stopping at the first failure.
    ///
    /// Before the episode row exists a failure leaves no trace and the task
    /// directory stays in place for a later batch. After that point failures
    /// are reported as inconsistent and the row stays unavailable.
    pub async fn ingest(&self, task: &ImportTask) -> Result<Ingested, ImportError> {
        let manifest = &task.manifest;
        manifest.validate()?;
        let published_at = manifest
            .publish_date()
            .ok_or(ManifestError::MissingDate)?;

        let duration = probe(task.audio_path()).await?;

        if let Some(image_path) = task.image_path() {
            let metadata = self
                .io("stat image", tokio::fs::metadata(&image_path))
                .await
                .map_err(|source| ImportError::MissingFile {
                    path: image_path.clone(),
                    source,
                })?;
            if !metadata.is_file() {
                return Err(ImportError::MissingFile {
                    path: image_path,
                    source: io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"),
                });
            }
        }

        let podcast = self
            .store
            .podcast_by_key(&manifest.podcast_key)
            .await?
            .ok_or_else(|| ImportError::NotFound {
                entity: "podcast",
                key: manifest.podcast_key.clone(),
            })?;
        let season = self
            .store
            .season_by_key(podcast.id, &manifest.season_key)
            .await?
            .ok_or_else(|| ImportError::NotFound {
                entity: "season",
                key: manifest.season_key.clone(),
            })?;

        let existing = self.store.episodes_by_season(season.id).await?;
        let num = next_ordinal(&existing);

        let mut episode = self
            .store
            .create_episode(&NewEpisode {
                season_id: season.id,
                num,
                title: manifest.title.clone(),
                subtitle: manifest.subtitle.clone(),
                published_at,
                author: manifest.author().to_string(),
                description: manifest.description.clone(),
                audio_duration: duration,
                video_url: manifest.video_url().to_string(),
            })
            .await?;
        let episode_id = episode.id;

        let layout = EpisodeLayout::new(podcast.id, episode_id, published_at, &episode.title);
        episode.audio_location = layout.audio.clone();
        if manifest.image().is_some() {
            episode.image_location = layout.image.clone();
        }

        self.transfer(task, &layout)
            .await
            .map_err(|source| ImportError::Transfer { episode_id, source })?;

        episode.available = true;
        self.store
            .update_episode(&episode)
            .await
            .map_err(|source| ImportError::Finalize { episode_id, source })?;

        tracing::info!(
            podcast_id = podcast.id,
            season = season.num,
            episode = episode.num,
            episode_id,
            duration,
            title = %episode.title,
            "Episode imported"
        );
        Ok(Ingested {
            podcast_id: podcast.id,
            episode,
        })
    }

    /// Moves the task's files into the canonical layout, then removes the
    /// task directory.
    async fn transfer(&self, task: &ImportTask, layout: &EpisodeLayout) -> io::Result<()> {
        let folder = EpisodeLayout::resolve(&self.podcast_dir, &layout.folder);
        self.io("create episode folder", tokio::fs::create_dir_all(&folder))
            .await?;

        let audio_dst = EpisodeLayout::resolve(&self.podcast_dir, &layout.audio);
        self.io("move audio", move_file(&task.audio_path(), &audio_dst))
            .await?;

        if let Some(image_src) = task.image_path() {
            let image_dst = EpisodeLayout::resolve(&self.podcast_dir, &layout.image);
            self.io("move image", move_file(&image_src, &image_dst))
                .await?;
        }

        self.io("remove task directory", tokio::fs::remove_dir_all(&task.base_dir))
            .await
    }

    async fn io<T>(&self, what: &str, op: impl Future<Output = io::Result<T>>) -> io::Result<T> {
        match tokio::time::timeout(self.io_timeout, op).await {
            Ok(result) => result,
            Err(_) => Err(io::Error::new(
                io::ErrorKind::TimedOut,
                format!("{what} timed out after {:?}", self.io_timeout),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn episode_with(num: i64) -> Episode {
        Episode {
            id: num,
            season_id: 1,
            num,
            title: String::new(),
            subtitle: String::new(),
            published_at: Utc::now(),
            author: String::new(),
            description: String::new(),
            image_location: String::new(),
            audio_location: String::new(),
            audio_duration: 0,
            video_url: String::new(),
            available: false,
        }
    }

    #[test]
    fn test_next_ordinal_empty_season() {
        assert_eq!(next_ordinal(&[]), 1);
    }

    #[test]
    fn test_next_ordinal_uses_max_not_count() {
        let existing = vec![episode_with(1), episode_with(5), episode_with(2)];
        assert_eq!(next_ordinal(&existing), 6);
    }

    #[test]
    fn test_inconsistent_classification() {
        let transfer = ImportError::Transfer {
            episode_id: 7,
            source: io::Error::other("disk full"),
        };
        assert!(transfer.is_inconsistent());
        assert!(transfer.to_string().contains("Episode 7 created but file transfer failed"));

        let not_found = ImportError::NotFound {
            entity: "season",
            key: "2024".to_string(),
        };
        assert!(!not_found.is_inconsistent());
        assert_eq!(not_found.to_string(), "No season with key \"2024\"");

        assert!(!ImportError::Validation(ManifestError::MissingTitle).is_inconsistent());
    }
}
