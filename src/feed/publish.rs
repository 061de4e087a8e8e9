use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use super::assemble::{assemble, AssemblyError, FeedDocument};
use super::rss::{render, FeedSettings};
use crate::layout::feed_path;
use crate::storage::{CatalogStore, DatabaseError, Episode, Owner, Podcast, Season};
use crate::util::fs::write_atomic;

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("Failed to load catalog: {0}")]
    Storage(#[from] DatabaseError),

    #[error("Podcast {0} does not exist")]
    MissingPodcast(i64),

    #[error("Owner {owner_id} of podcast {podcast_id} does not exist")]
    MissingOwner { podcast_id: i64, owner_id: i64 },

    #[error("Feed assembly failed: {0}")]
    Assembly(#[from] AssemblyError),

    #[error("Failed to render feed: {0}")]
    Render(String),

    #[error("Failed to write feed {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Everything read from the catalog for one feed, before validation.
#[derive(Debug, Clone)]
pub struct FeedSnapshot {
    pub owner: Owner,
    pub podcast: Podcast,
    pub seasons: Vec<Season>,
    pub episodes: Vec<Episode>,
}

impl FeedSnapshot {
    /// Assembles and renders the snapshot into feed bytes.
    pub fn build(self, settings: &FeedSettings) -> Result<Vec<u8>, PublishError> {
        let doc: FeedDocument = assemble(self.owner, self.podcast, self.seasons, self.episodes)?;
        render(&doc, settings).map_err(|e| PublishError::Render(format!("{e:#}")))
    }
}

/// Regenerates feed files from the catalog.
///
/// A feed is only replaced once the whole document has been built, so a
/// failing podcast keeps its previously published feed.
#[derive(Clone)]
pub struct FeedPublisher {
    store: Arc<dyn CatalogStore>,
    podcast_dir: PathBuf,
    settings: FeedSettings,
}

impl FeedPublisher {
    pub fn new(store: Arc<dyn CatalogStore>, podcast_dir: PathBuf, settings: FeedSettings) -> Self {
        Self {
            store,
            podcast_dir,
            settings,
        }
    }

    pub async fn load_snapshot(&self, podcast_id: i64) -> Result<FeedSnapshot, PublishError> {
        let podcast = self
            .store
            .podcast_by_id(podcast_id)
            .await?
            .ok_or(PublishError::MissingPodcast(podcast_id))?;
        let owner = self
            .store
            .owner_by_id(podcast.owner_id)
            .await?
            .ok_or(PublishError::MissingOwner {
                podcast_id,
                owner_id: podcast.owner_id,
            })?;
        let seasons = self.store.seasons_by_podcast(podcast_id).await?;
        let episodes = self.store.available_episodes_by_podcast(podcast_id).await?;

        Ok(FeedSnapshot {
            owner,
            podcast,
            seasons,
            episodes,
        })
    }

    /// Rebuilds and atomically replaces `{podcast_dir}/{podcast_id}/podcast.xml`.
    ///
    /// Returns the path written.
    pub async fn publish(&self, podcast_id: i64) -> Result<PathBuf, PublishError> {
        let snapshot = self.load_snapshot(podcast_id).await?;
        let episode_count = snapshot.episodes.len();
        let bytes = snapshot.build(&self.settings)?;

        let path = feed_path(&self.podcast_dir, podcast_id);
        let target = path.clone();
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            write_atomic(&target, &bytes)
        })
        .await
        .map_err(|e| PublishError::Write {
            path: path.clone(),
            source: std::io::Error::other(e),
        })?
        .map_err(|source| PublishError::Write {
            path: path.clone(),
            source,
        })?;

        tracing::info!(
            podcast_id,
            episodes = episode_count,
            path = %path.display(),
            "Feed published"
        );
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Database, NewEpisode, NewOwner, NewPodcast, NewSeason};
    use chrono::{TimeZone, Utc};

    async fn seeded() -> (Arc<Database>, i64, i64) {
        let db = Database::open(":memory:").await.unwrap();
        let owner = db
            .create_owner(&NewOwner {
                name: "Example Church".to_string(),
                email: "media@example.org".to_string(),
                copyright: "(c) Example Church".to_string(),
            })
            .await
            .unwrap();
        let podcast = db
            .create_podcast(&NewPodcast {
                key: "sermons".to_string(),
                title: "Sunday Sermons".to_string(),
                subtitle: String::new(),
                language: "en".to_string(),
                owner_id: owner.id,
                description: "Weekly".to_string(),
                keywords: vec!["faith".to_string()],
                link: "https://example.org".to_string(),
                feed_link: "https://cdn.example.org/1/podcast.xml".to_string(),
                image_location: String::new(),
                kind: "episodic".to_string(),
            })
            .await
            .unwrap();
        let season = db
            .create_season(&NewSeason {
                podcast_id: podcast.id,
                num: 1,
                key: "2023".to_string(),
                title: "2023".to_string(),
                subtitle: String::new(),
                description: String::new(),
                image_location: String::new(),
            })
            .await
            .unwrap();
        (Arc::new(db), podcast.id, season.id)
    }

    fn new_episode(season_id: i64, num: i64, title: &str) -> NewEpisode {
        NewEpisode {
            season_id,
            num,
            title: title.to_string(),
            subtitle: String::new(),
            published_at: Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap(),
            author: "Pastor".to_string(),
            description: String::new(),
            audio_duration: 60,
            video_url: String::new(),
        }
    }

    #[tokio::test]
    async fn test_snapshot_skips_unavailable_episodes() {
        let (db, podcast_id, season_id) = seeded().await;
        let mut ready = db.create_episode(&new_episode(season_id, 1, "Ready")).await.unwrap();
        ready.available = true;
        ready.audio_location = "1/x/1_Ready.mp3".to_string();
        db.update_episode(&ready).await.unwrap();
        db.create_episode(&new_episode(season_id, 2, "Pending"))
            .await
            .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let publisher = FeedPublisher::new(
            db.clone(),
            dir.path().to_path_buf(),
            FeedSettings::default(),
        );
        let snapshot = publisher.load_snapshot(podcast_id).await.unwrap();

        assert_eq!(snapshot.seasons.len(), 1);
        assert_eq!(snapshot.episodes.len(), 1);
        assert_eq!(snapshot.episodes[0].title, "Ready");
    }

    #[tokio::test]
    async fn test_publish_writes_feed_file() {
        let (db, podcast_id, _) = seeded().await;
        let dir = tempfile::tempdir().unwrap();
        let publisher = FeedPublisher::new(db, dir.path().to_path_buf(), FeedSettings::default());

        let path = publisher.publish(podcast_id).await.unwrap();

        assert_eq!(path, dir.path().join(podcast_id.to_string()).join("podcast.xml"));
        let xml = std::fs::read_to_string(&path).unwrap();
        assert!(xml.contains("<title>Sunday Sermons</title>"));
        assert!(!xml.contains("<item>"));
    }

    #[tokio::test]
    async fn test_publish_unknown_podcast() {
        let (db, _, _) = seeded().await;
        let dir = tempfile::tempdir().unwrap();
        let publisher = FeedPublisher::new(db, dir.path().to_path_buf(), FeedSettings::default());

        let err = publisher.publish(999).await.unwrap_err();
        assert!(matches!(err, PublishError::MissingPodcast(999)));
        assert!(!dir.path().join("999").exists());
    }
}
