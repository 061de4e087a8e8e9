use sqlx::SqliteExecutor;

use super::schema::Database;
use super::types::{DatabaseError, NewSeason, Season};

const SEASON_COLUMNS: &str =
    "id, podcast_id, num, key, title, subtitle, description, image_location";

impl Database {
    // ========================================================================
    // Season Operations
    // ========================================================================

    /// Insert a season and return it with its assigned id.
    ///
    /// Ordinals and keys are unique per podcast; a clash is a constraint error.
    pub async fn create_season(&self, season: &NewSeason) -> Result<Season, DatabaseError> {
        Ok(insert_season(&self.pool, season).await?)
    }

    /// Look up a season by key, scoped to one podcast
    pub async fn get_season_by_key(
        &self,
        podcast_id: i64,
        key: &str,
    ) -> Result<Option<Season>, DatabaseError> {
        let season = sqlx::query_as::<_, Season>(&format!(
            "SELECT {SEASON_COLUMNS} FROM seasons WHERE podcast_id = ? AND key = ?"
        ))
        .bind(podcast_id)
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(season)
    }

    /// All seasons of a podcast in ordinal order
    pub async fn get_seasons_for_podcast(
        &self,
        podcast_id: i64,
    ) -> Result<Vec<Season>, DatabaseError> {
        let seasons = sqlx::query_as::<_, Season>(&format!(
            "SELECT {SEASON_COLUMNS} FROM seasons WHERE podcast_id = ? ORDER BY num"
        ))
        .bind(podcast_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(seasons)
    }
}

pub(super) async fn insert_season<'e>(
    executor: impl SqliteExecutor<'e>,
    season: &NewSeason,
) -> Result<Season, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO seasons (podcast_id, num, key, title, subtitle, description, image_location)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        RETURNING id
    "#,
    )
    .bind(season.podcast_id)
    .bind(season.num)
    .bind(&season.key)
    .bind(&season.title)
    .bind(&season.subtitle)
    .bind(&season.description)
    .bind(&season.image_location)
    .fetch_one(executor)
    .await?;

    Ok(Season {
        id,
        podcast_id: season.podcast_id,
        num: season.num,
        key: season.key.clone(),
        title: season.title.clone(),
        subtitle: season.subtitle.clone(),
        description: season.description.clone(),
        image_location: season.image_location.clone(),
    })
}

#[cfg(test)]
mod tests {
    use crate::storage::{Database, NewOwner, NewPodcast, NewSeason};

    async fn seeded_podcast(db: &Database, key: &str) -> i64 {
        let owner = db
            .create_owner(&NewOwner {
                name: "Owner".to_string(),
                email: String::new(),
                copyright: String::new(),
            })
            .await
            .unwrap();
        db.create_podcast(&NewPodcast {
            key: key.to_string(),
            title: key.to_string(),
            subtitle: String::new(),
            language: "de-de".to_string(),
            owner_id: owner.id,
            description: String::new(),
            keywords: Vec::new(),
            link: String::new(),
            feed_link: String::new(),
            image_location: String::new(),
            kind: String::new(),
        })
        .await
        .unwrap()
        .id
    }

    fn test_season(podcast_id: i64, num: i64, key: &str) -> NewSeason {
        NewSeason {
            podcast_id,
            num,
            key: key.to_string(),
            title: format!("Season {key}"),
            subtitle: String::new(),
            description: String::new(),
            image_location: String::new(),
        }
    }

    #[tokio::test]
    async fn test_season_key_is_scoped_to_podcast() {
        let db = Database::open(":memory:").await.unwrap();
        let sermons = seeded_podcast(&db, "sermons").await;
        let events = seeded_podcast(&db, "events").await;

        db.create_season(&test_season(sermons, 1, "2023")).await.unwrap();
        db.create_season(&test_season(events, 1, "2023")).await.unwrap();

        let found = db.get_season_by_key(sermons, "2023").await.unwrap().unwrap();
        assert_eq!(found.podcast_id, sermons);
        assert!(db.get_season_by_key(sermons, "2024").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_duplicate_ordinal_in_podcast_rejected() {
        let db = Database::open(":memory:").await.unwrap();
        let podcast = seeded_podcast(&db, "sermons").await;

        db.create_season(&test_season(podcast, 1, "2023")).await.unwrap();
        let result = db.create_season(&test_season(podcast, 1, "2024")).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_seasons_listed_in_ordinal_order() {
        let db = Database::open(":memory:").await.unwrap();
        let podcast = seeded_podcast(&db, "sermons").await;

        db.create_season(&test_season(podcast, 2, "2024")).await.unwrap();
        db.create_season(&test_season(podcast, 1, "2023")).await.unwrap();

        let seasons = db.get_seasons_for_podcast(podcast).await.unwrap();
        let nums: Vec<i64> = seasons.iter().map(|s| s.num).collect();
        assert_eq!(nums, vec![1, 2]);
    }
}
