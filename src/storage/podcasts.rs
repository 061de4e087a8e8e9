use sqlx::SqliteExecutor;

use super::schema::Database;
use super::seasons::insert_season;
use super::types::{
    DatabaseError, NewOwner, NewPodcast, NewSeason, Owner, Podcast, PodcastRow, Season,
};

const PODCAST_COLUMNS: &str = "id, key, title, subtitle, language, owner_id, description, \
     keywords, link, feed_link, image_location, kind";

impl Database {
    // ========================================================================
    // Owner Operations
    // ========================================================================

    /// Insert an owner and return it with its assigned id
    pub async fn create_owner(&self, owner: &NewOwner) -> Result<Owner, DatabaseError> {
        let id = insert_owner(&self.pool, owner).await?;
        Ok(owner_with_id(id, owner))
    }

    pub async fn get_owner(&self, id: i64) -> Result<Option<Owner>, DatabaseError> {
        let owner = sqlx::query_as::<_, Owner>(
            "SELECT id, name, email, copyright FROM owners WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(owner)
    }

    // ========================================================================
    // Podcast Operations
    // ========================================================================

    /// Insert a podcast and return it with its assigned id.
    ///
    /// Fails with a constraint violation when `key` is already taken or the
    /// owner does not exist.
    pub async fn create_podcast(&self, podcast: &NewPodcast) -> Result<Podcast, DatabaseError> {
        let id = insert_podcast(&self.pool, podcast).await?;
        Ok(podcast_with_id(id, podcast))
    }

    /// Insert an owner, a podcast and its seasons in one transaction.
    ///
    /// `podcast.owner_id` and each `podcast_id` in `seasons` are replaced by
    /// the freshly assigned ids. An empty feed link is set to `feed_link(id)`
    /// once the podcast id is known. Any failure rolls back every insert, so
    /// a podcast key is never taken by a half-seeded podcast.
    pub async fn create_podcast_with_seasons(
        &self,
        owner: &NewOwner,
        podcast: &NewPodcast,
        seasons: &[NewSeason],
        feed_link: impl FnOnce(i64) -> Option<String>,
    ) -> Result<(Podcast, Vec<Season>), DatabaseError> {
        let mut tx = self.pool.begin().await?;

        let owner_id = insert_owner(&mut *tx, owner).await?;
        let podcast = NewPodcast {
            owner_id,
            ..podcast.clone()
        };
        let podcast_id = insert_podcast(&mut *tx, &podcast).await?;
        let mut podcast = podcast_with_id(podcast_id, &podcast);

        if podcast.feed_link.is_empty() {
            if let Some(link) = feed_link(podcast_id) {
                sqlx::query("UPDATE podcasts SET feed_link = ? WHERE id = ?")
                    .bind(&link)
                    .bind(podcast_id)
                    .execute(&mut *tx)
                    .await?;
                podcast.feed_link = link;
            }
        }

        let mut created = Vec::with_capacity(seasons.len());
        for season in seasons {
            let season = NewSeason {
                podcast_id,
                ..season.clone()
            };
            created.push(insert_season(&mut *tx, &season).await?);
        }

        tx.commit().await?;
        Ok((podcast, created))
    }

    /// Overwrite every mutable column of a podcast. The id is the identity.
    pub async fn update_podcast(&self, podcast: &Podcast) -> Result<(), DatabaseError> {
        sqlx::query(
            r#"
            UPDATE podcasts SET
                key = ?, title = ?, subtitle = ?, language = ?, owner_id = ?,
                description = ?, keywords = ?, link = ?, feed_link = ?,
                image_location = ?, kind = ?
            WHERE id = ?
        "#,
        )
        .bind(&podcast.key)
        .bind(&podcast.title)
        .bind(&podcast.subtitle)
        .bind(&podcast.language)
        .bind(podcast.owner_id)
        .bind(&podcast.description)
        .bind(podcast.keywords.join(","))
        .bind(&podcast.link)
        .bind(&podcast.feed_link)
        .bind(&podcast.image_location)
        .bind(&podcast.kind)
        .bind(podcast.id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_podcast(&self, id: i64) -> Result<Option<Podcast>, DatabaseError> {
        let row = sqlx::query_as::<_, PodcastRow>(&format!(
            "SELECT {PODCAST_COLUMNS} FROM podcasts WHERE id = ?"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(PodcastRow::into_podcast))
    }

    pub async fn get_podcast_by_key(&self, key: &str) -> Result<Option<Podcast>, DatabaseError> {
        let row = sqlx::query_as::<_, PodcastRow>(&format!(
            "SELECT {PODCAST_COLUMNS} FROM podcasts WHERE key = ?"
        ))
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(PodcastRow::into_podcast))
    }

    /// All podcasts ordered by key
    pub async fn list_podcasts(&self) -> Result<Vec<Podcast>, DatabaseError> {
        let rows = sqlx::query_as::<_, PodcastRow>(&format!(
            "SELECT {PODCAST_COLUMNS} FROM podcasts ORDER BY key"
        ))
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(PodcastRow::into_podcast).collect())
    }
}

async fn insert_owner<'e>(
    executor: impl SqliteExecutor<'e>,
    owner: &NewOwner,
) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        "INSERT INTO owners (name, email, copyright) VALUES (?, ?, ?) RETURNING id",
    )
    .bind(&owner.name)
    .bind(&owner.email)
    .bind(&owner.copyright)
    .fetch_one(executor)
    .await?;
    Ok(id)
}

fn owner_with_id(id: i64, owner: &NewOwner) -> Owner {
    Owner {
        id,
        name: owner.name.clone(),
        email: owner.email.clone(),
        copyright: owner.copyright.clone(),
    }
}

async fn insert_podcast<'e>(
    executor: impl SqliteExecutor<'e>,
    podcast: &NewPodcast,
) -> Result<i64, sqlx::Error> {
    let (id,): (i64,) = sqlx::query_as(
        r#"
        INSERT INTO podcasts (key, title, subtitle, language, owner_id, description,
                              keywords, link, feed_link, image_location, kind)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        RETURNING id
    "#,
    )
    .bind(&podcast.key)
    .bind(&podcast.title)
    .bind(&podcast.subtitle)
    .bind(&podcast.language)
    .bind(podcast.owner_id)
    .bind(&podcast.description)
    .bind(podcast.keywords.join(","))
    .bind(&podcast.link)
    .bind(&podcast.feed_link)
    .bind(&podcast.image_location)
    .bind(&podcast.kind)
    .fetch_one(executor)
    .await?;
    Ok(id)
}

fn podcast_with_id(id: i64, podcast: &NewPodcast) -> Podcast {
    Podcast {
        id,
        key: podcast.key.clone(),
        title: podcast.title.clone(),
        subtitle: podcast.subtitle.clone(),
        language: podcast.language.clone(),
        owner_id: podcast.owner_id,
        description: podcast.description.clone(),
        keywords: podcast.keywords.clone(),
        link: podcast.link.clone(),
        feed_link: podcast.feed_link.clone(),
        image_location: podcast.image_location.clone(),
        kind: podcast.kind.clone(),
    }
}
