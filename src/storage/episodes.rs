use super::schema::Database;
use super::types::{DatabaseError, Episode, EpisodeRow, NewEpisode};

const EPISODE_COLUMNS: &str = "e.id, e.season_id, e.num, e.title, e.subtitle, e.published_at, \
     e.author, e.description, e.image_location, e.audio_location, e.audio_duration, \
     e.video_url, e.available";

impl Database {
    // ========================================================================
    // Episode Operations
    // ========================================================================

    /// Insert an episode as unavailable and return it with its assigned id.
    ///
    /// File locations start empty; they are only known once the id exists.
    pub async fn create_episode(&self, episode: &NewEpisode) -> Result<Episode, DatabaseError> {
        let (id,): (i64,) = sqlx::query_as(
            r#"
            INSERT INTO episodes (season_id, num, title, subtitle, published_at, author,
                                  description, audio_duration, video_url, available)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0)
            RETURNING id
        "#,
        )
        .bind(episode.season_id)
        .bind(episode.num)
        .bind(&episode.title)
        .bind(&episode.subtitle)
        .bind(episode.published_at.timestamp())
        .bind(&episode.author)
        .bind(&episode.description)
        .bind(episode.audio_duration)
        .bind(&episode.video_url)
        .fetch_one(&self.pool)
        .await?;

        Ok(Episode {
            id,
            season_id: episode.season_id,
            num: episode.num,
            title: episode.title.clone(),
            subtitle: episode.subtitle.clone(),
            published_at: episode.published_at,
            author: episode.author.clone(),
            description: episode.description.clone(),
            image_location: String::new(),
            audio_location: String::new(),
            audio_duration: episode.audio_duration,
            video_url: episode.video_url.clone(),
            available: false,
        })
    }

    /// Overwrite every mutable column of an episode. The id is the identity.
    pub async fn update_episode(&self, episode: &Episode) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            UPDATE episodes SET
                season_id = ?, num = ?, title = ?, subtitle = ?, published_at = ?,
                author = ?, description = ?, image_location = ?, audio_location = ?,
                audio_duration = ?, video_url = ?, available = ?
            WHERE id = ?
        "#,
        )
        .bind(episode.season_id)
        .bind(episode.num)
        .bind(&episode.title)
        .bind(&episode.subtitle)
        .bind(episode.published_at.timestamp())
        .bind(&episode.author)
        .bind(&episode.description)
        .bind(&episode.image_location)
        .bind(&episode.audio_location)
        .bind(episode.audio_duration)
        .bind(&episode.video_url)
        .bind(episode.available)
        .bind(episode.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_episode(&self, id: i64) -> Result<Option<Episode>, DatabaseError> {
        let row = sqlx::query_as::<_, EpisodeRow>(&format!(
            "SELECT {EPISODE_COLUMNS} FROM episodes e WHERE e.id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(EpisodeRow::into_episode))
    }

    /// Every episode of a season, available or not, in ordinal order
    pub async fn get_episodes_for_season(
        &self,
        season_id: i64,
    ) -> Result<Vec<Episode>, DatabaseError> {
        let rows = sqlx::query_as::<_, EpisodeRow>(&format!(
            "SELECT {EPISODE_COLUMNS} FROM episodes e WHERE e.season_id = ? ORDER BY e.num"
        ))
        .bind(season_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(EpisodeRow::into_episode).collect())
    }

    /// Published episodes across all seasons of a podcast
    pub async fn get_available_episodes_for_podcast(
        &self,
        podcast_id: i64,
    ) -> Result<Vec<Episode>, DatabaseError> {
        let rows = sqlx::query_as::<_, EpisodeRow>(&format!(
            r#"
            SELECT {EPISODE_COLUMNS}
            FROM episodes e
            JOIN seasons s ON e.season_id = s.id
            WHERE s.podcast_id = ? AND e.available = 1
            ORDER BY s.num, e.num
        "#
        ))
        .bind(podcast_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(EpisodeRow::into_episode).collect())
    }
}
