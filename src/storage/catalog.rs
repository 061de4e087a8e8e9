//! The storage surface the import pipeline and feed publisher depend on.
//!
//! The core never issues queries itself. It talks to a [`CatalogStore`],
//! which [`Database`] implements on top of SQLite.

use async_trait::async_trait;

use super::schema::Database;
use super::types::{DatabaseError, Episode, NewEpisode, Owner, Podcast, Season};

#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn podcast_by_key(&self, key: &str) -> Result<Option<Podcast>, DatabaseError>;

    async fn podcast_by_id(&self, id: i64) -> Result<Option<Podcast>, DatabaseError>;

    async fn owner_by_id(&self, id: i64) -> Result<Option<Owner>, DatabaseError>;

    /// Season lookup by key within a single podcast.
    async fn season_by_key(
        &self,
        podcast_id: i64,
        key: &str,
    ) -> Result<Option<Season>, DatabaseError>;

    async fn seasons_by_podcast(&self, podcast_id: i64) -> Result<Vec<Season>, DatabaseError>;

    /// All episodes of a season, including unavailable ones.
    async fn episodes_by_season(&self, season_id: i64) -> Result<Vec<Episode>, DatabaseError>;

    /// Episodes that are safe to publish, across every season of a podcast.
    async fn available_episodes_by_podcast(
        &self,
        podcast_id: i64,
    ) -> Result<Vec<Episode>, DatabaseError>;

    async fn create_episode(&self, episode: &NewEpisode) -> Result<Episode, DatabaseError>;

    async fn update_episode(&self, episode: &Episode) -> Result<(), DatabaseError>;
}

#[async_trait]
impl CatalogStore for Database {
    async fn podcast_by_key(&self, key: &str) -> Result<Option<Podcast>, DatabaseError> {
        self.get_podcast_by_key(key).await
    }

    async fn podcast_by_id(&self, id: i64) -> Result<Option<Podcast>, DatabaseError> {
        self.get_podcast(id).await
    }

    async fn owner_by_id(&self, id: i64) -> Result<Option<Owner>, DatabaseError> {
        self.get_owner(id).await
    }

    async fn season_by_key(
        &self,
        podcast_id: i64,
        key: &str,
    ) -> Result<Option<Season>, DatabaseError> {
        self.get_season_by_key(podcast_id, key).await
    }

    async fn seasons_by_podcast(&self, podcast_id: i64) -> Result<Vec<Season>, DatabaseError> {
        self.get_seasons_for_podcast(podcast_id).await
    }

    async fn episodes_by_season(&self, season_id: i64) -> Result<Vec<Episode>, DatabaseError> {
        self.get_episodes_for_season(season_id).await
    }

    async fn available_episodes_by_podcast(
        &self,
        podcast_id: i64,
    ) -> Result<Vec<Episode>, DatabaseError> {
        self.get_available_episodes_for_podcast(podcast_id).await
    }

    async fn create_episode(&self, episode: &NewEpisode) -> Result<Episode, DatabaseError> {
        Database::create_episode(self, episode).await
    }

    async fn update_episode(&self, episode: &Episode) -> Result<(), DatabaseError> {
        Database::update_episode(self, episode).await
    }
}
