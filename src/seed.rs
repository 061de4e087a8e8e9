//! Catalog seeding from a TOML file.
//!
//! ```toml
//! [[podcasts]]
//! key = "sermons"
//! title = "Sunday Sermons"
//! owner = { name = "Example Church", email = "media@example.org" }
//!
//! [[podcasts.seasons]]
//! num = 1
//! key = "2023"
//! title = "2023"
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::layout::FEED_FILE_NAME;
use crate::storage::{Database, DatabaseError, NewOwner, NewPodcast, NewSeason};
use crate::util::join_url;

#[derive(Debug, Error)]
pub enum SeedError {
    #[error("Failed to read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid seed file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to write catalog: {0}")]
    Storage(#[from] DatabaseError),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedCatalog {
    #[serde(default)]
    pub podcasts: Vec<SeedPodcast>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedOwner {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub copyright: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedPodcast {
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub link: String,
    /// Derived from the static content URL when left out.
    #[serde(default)]
    pub feed_link: String,
    #[serde(default)]
    pub image_location: String,
    #[serde(default = "default_kind", rename = "type")]
    pub kind: String,
    pub owner: SeedOwner,
    #[serde(default)]
    pub seasons: Vec<SeedSeason>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SeedSeason {
    pub num: i64,
    pub key: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub image_location: String,
}

fn default_language() -> String {
    "en".to_string()
}

fn default_kind() -> String {
    "episodic".to_string()
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub podcasts_created: usize,
    pub podcasts_skipped: usize,
    pub seasons_created: usize,
}

impl SeedCatalog {
    pub fn load(path: &Path) -> Result<Self, SeedError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }
}

/// Creates every podcast in `catalog` whose key is not taken yet, together
/// with its owner and seasons.
///
/// Each podcast is written as a unit. When one fails the error is returned
/// and nothing of that podcast is kept, so a corrected file can be seeded
/// again.
pub async fn seed_catalog(
    db: &Database,
    catalog: &SeedCatalog,
    static_content_url: &str,
) -> Result<SeedReport, SeedError> {
    let mut report = SeedReport::default();

    for entry in &catalog.podcasts {
        if db.get_podcast_by_key(&entry.key).await?.is_some() {
            tracing::info!(key = %entry.key, "Podcast already exists, skipping");
            report.podcasts_skipped += 1;
            continue;
        }

        let owner = NewOwner {
            name: entry.owner.name.clone(),
            email: entry.owner.email.clone(),
            copyright: entry.owner.copyright.clone(),
        };
        let podcast = NewPodcast {
            key: entry.key.clone(),
            title: entry.title.clone(),
            subtitle: entry.subtitle.clone(),
            language: entry.language.clone(),
            owner_id: 0,
            description: entry.description.clone(),
            keywords: entry.keywords.clone(),
            link: entry.link.clone(),
            feed_link: entry.feed_link.clone(),
            image_location: entry.image_location.clone(),
            kind: entry.kind.clone(),
        };
        let seasons: Vec<NewSeason> = entry
            .seasons
            .iter()
            .map(|season| NewSeason {
                podcast_id: 0,
                num: season.num,
                key: season.key.clone(),
                title: season.title.clone(),
                subtitle: season.subtitle.clone(),
                description: season.description.clone(),
                image_location: season.image_location.clone(),
            })
            .collect();

        let (podcast, created) = db
            .create_podcast_with_seasons(&owner, &podcast, &seasons, |id| {
                join_url(static_content_url, &format!("{id}/{FEED_FILE_NAME}"))
            })
            .await?;
        report.seasons_created += created.len();

        tracing::info!(
            key = %podcast.key,
            podcast_id = podcast.id,
            seasons = created.len(),
            "Seeded podcast"
        );
        report.podcasts_created += 1;
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const CATALOG: &str = r#"
[[podcasts]]
key = "sermons"
title = "Sunday Sermons"
keywords = ["faith", "grace"]
owner = { name = "Example Church", email = "media@example.org" }

[[podcasts.seasons]]
num = 1
key = "2023"
title = "2023"

[[podcasts.seasons]]
num = 2
key = "2024"
title = "2024"

[[podcasts]]
key = "youth"
title = "Youth Night"
feed_link = "https://feeds.example.org/youth.xml"
owner = { name = "Example Church", email = "youth@example.org", copyright = "(c) 2024" }
"#;

    #[tokio::test]
    async fn test_seed_creates_catalog() {
        let db = Database::open(":memory:").await.unwrap();
        let catalog: SeedCatalog = toml::from_str(CATALOG).unwrap();

        let report = seed_catalog(&db, &catalog, "https://cdn.example.org/podcasts")
            .await
            .unwrap();
        assert_eq!(
            report,
            SeedReport {
                podcasts_created: 2,
                podcasts_skipped: 0,
                seasons_created: 2,
            }
        );

        let sermons = db.get_podcast_by_key("sermons").await.unwrap().unwrap();
        assert_eq!(sermons.language, "en");
        assert_eq!(sermons.keywords, vec!["faith", "grace"]);
        assert_eq!(
            sermons.feed_link,
            format!("https://cdn.example.org/podcasts/{}/podcast.xml", sermons.id)
        );
        let seasons = db.get_seasons_for_podcast(sermons.id).await.unwrap();
        assert_eq!(seasons.len(), 2);

        let youth = db.get_podcast_by_key("youth").await.unwrap().unwrap();
        assert_eq!(youth.feed_link, "https://feeds.example.org/youth.xml");
    }

    #[tokio::test]
    async fn test_seed_skips_existing_keys() {
        let db = Database::open(":memory:").await.unwrap();
        let catalog: SeedCatalog = toml::from_str(CATALOG).unwrap();
        seed_catalog(&db, &catalog, "http://localhost").await.unwrap();

        let report = seed_catalog(&db, &catalog, "http://localhost").await.unwrap();
        assert_eq!(report.podcasts_created, 0);
        assert_eq!(report.podcasts_skipped, 2);
        assert_eq!(db.list_podcasts().await.unwrap().len(), 2);
    }

    #[test]
    fn test_owner_is_required() {
        let result: Result<SeedCatalog, _> = toml::from_str("[[podcasts]]\nkey = \"a\"\ntitle = \"A\"\n");
        assert!(result.is_err());
    }

    const DUPLICATE_SEASONS: &str = r#"
[[podcasts]]
key = "sermons"
title = "Sunday Sermons"
owner = { name = "Example Church", email = "media@example.org" }

[[podcasts.seasons]]
num = 1
key = "a"
title = "A"

[[podcasts.seasons]]
num = 1
key = "b"
title = "B"
"#;

    #[tokio::test]
    async fn test_failed_podcast_leaves_nothing_behind() {
        let db = Database::open(":memory:").await.unwrap();
        let broken: SeedCatalog = toml::from_str(DUPLICATE_SEASONS).unwrap();

        let result = seed_catalog(&db, &broken, "http://localhost").await;
        assert!(matches!(result, Err(SeedError::Storage(_))));
        assert!(db.get_podcast_by_key("sermons").await.unwrap().is_none());
        assert!(db.list_podcasts().await.unwrap().is_empty());

        // The corrected file seeds the whole podcast
        let fixed: SeedCatalog = toml::from_str(&DUPLICATE_SEASONS.replacen(
            "num = 1\nkey = \"b\"",
            "num = 2\nkey = \"b\"",
            1,
        ))
        .unwrap();
        let report = seed_catalog(&db, &fixed, "http://localhost").await.unwrap();
        assert_eq!(
            report,
            SeedReport {
                podcasts_created: 1,
                podcasts_skipped: 0,
                seasons_created: 2,
            }
        );

        let podcast = db.get_podcast_by_key("sermons").await.unwrap().unwrap();
        let keys: Vec<String> = db
            .get_seasons_for_podcast(podcast.id)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.key)
            .collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(
            podcast.feed_link,
            format!("http://localhost/{}/podcast.xml", podcast.id)
        );
    }
}
