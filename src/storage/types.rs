use chrono::{DateTime, TimeZone, Utc};
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Database-specific errors with user-friendly messages
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Another process holds a lock on the catalog database
    #[error("The catalog database is locked by another process. Please close it and try again.")]
    InstanceLocked,

    /// Migration failed
    #[error("Database migration failed: {0}")]
    Migration(String),

    /// Generic database error
    #[error("Database error: {0}")]
    Other(#[from] sqlx::Error),
}

impl DatabaseError {
    /// Check if a sqlx error indicates database locking
    pub(crate) fn from_sqlx(err: sqlx::Error) -> Self {
        if is_lock_message(&err.to_string()) {
            return DatabaseError::InstanceLocked;
        }
        DatabaseError::Other(err)
    }
}

/// SQLITE_BUSY (5), SQLITE_LOCKED (6) and SQLITE_CANTOPEN (14) all surface as
/// lock contention for our purposes.
pub(crate) fn is_lock_message(message: &str) -> bool {
    let message = message.to_lowercase();
    message.contains("database is locked")
        || message.contains("database table is locked")
        || message.contains("sqlite_busy")
        || message.contains("sqlite_locked")
        || message.contains("unable to open database file")
}

// ============================================================================
// Row Types
// ============================================================================

/// Internal row type for podcast queries. Keywords are stored comma-joined.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct PodcastRow {
    pub id: i64,
    pub key: String,
    pub title: String,
    pub subtitle: String,
    pub language: String,
    pub owner_id: i64,
    pub description: String,
    pub keywords: String,
    pub link: String,
    pub feed_link: String,
    pub image_location: String,
    pub kind: String,
}

impl PodcastRow {
    pub(crate) fn into_podcast(self) -> Podcast {
        Podcast {
            id: self.id,
            key: self.key,
            title: self.title,
            subtitle: self.subtitle,
            language: self.language,
            owner_id: self.owner_id,
            description: self.description,
            keywords: split_keywords(&self.keywords),
            link: self.link,
            feed_link: self.feed_link,
            image_location: self.image_location,
            kind: self.kind,
        }
    }
}

/// Internal row type for episode queries. `published_at` is a unix timestamp.
#[derive(Debug, sqlx::FromRow)]
pub(crate) struct EpisodeRow {
    pub id: i64,
    pub season_id: i64,
    pub num: i64,
    pub title: String,
    pub subtitle: String,
    pub published_at: i64,
    pub author: String,
    pub description: String,
    pub image_location: String,
    pub audio_location: String,
    pub audio_duration: i64,
    pub video_url: String,
    pub available: bool,
}

impl EpisodeRow {
    pub(crate) fn into_episode(self) -> Episode {
        Episode {
            id: self.id,
            season_id: self.season_id,
            num: self.num,
            title: self.title,
            subtitle: self.subtitle,
            published_at: timestamp_to_utc(self.published_at),
            author: self.author,
            description: self.description,
            image_location: self.image_location,
            audio_location: self.audio_location,
            audio_duration: self.audio_duration,
            video_url: self.video_url,
            available: self.available,
        }
    }
}

fn timestamp_to_utc(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0)
        .single()
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

pub(crate) fn split_keywords(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|k| !k.is_empty())
        .map(str::to_string)
        .collect()
}

// ============================================================================
// Data Structures
// ============================================================================

/// Owner of one or more podcasts. Supplies the feed's copyright and contact.
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Owner {
    pub id: i64,
    pub name: String,
    pub email: String,
    pub copyright: String,
}

/// A podcast channel. `key` is the stable handle manifests refer to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Podcast {
    pub id: i64,
    pub key: String,
    pub title: String,
    pub subtitle: String,
    /// Language tag such as `de-de` or `en-us`.
    pub language: String,
    pub owner_id: i64,
    pub description: String,
    pub keywords: Vec<String>,
    pub link: String,
    pub feed_link: String,
    /// Location relative to the static content root, empty when unset.
    pub image_location: String,
    /// Free-form podcast type (`sermon`, `service`, `event`, ...).
    pub kind: String,
}

#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct Season {
    pub id: i64,
    pub podcast_id: i64,
    pub num: i64,
    pub key: String,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub image_location: String,
}

/// An episode row.
///
/// `available` stays false until every file of the episode sits at its
/// canonical location; only available episodes are published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Episode {
    pub id: i64,
    pub season_id: i64,
    pub num: i64,
    pub title: String,
    pub subtitle: String,
    pub published_at: DateTime<Utc>,
    pub author: String,
    pub description: String,
    pub image_location: String,
    pub audio_location: String,
    /// Audio duration in whole seconds.
    pub audio_duration: i64,
    pub video_url: String,
    pub available: bool,
}

// ============================================================================
// Insert Types
// ============================================================================

#[derive(Debug, Clone)]
pub struct NewOwner {
    pub name: String,
    pub email: String,
    pub copyright: String,
}

#[derive(Debug, Clone)]
pub struct NewPodcast {
    pub key: String,
    pub title: String,
    pub subtitle: String,
    pub language: String,
    pub owner_id: i64,
    pub description: String,
    pub keywords: Vec<String>,
    pub link: String,
    pub feed_link: String,
    pub image_location: String,
    pub kind: String,
}

#[derive(Debug, Clone)]
pub struct NewSeason {
    pub podcast_id: i64,
    pub num: i64,
    pub key: String,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub image_location: String,
}

/// Episode data known before the row exists. File locations are filled in
/// by [`update_episode`](super::CatalogStore::update_episode) once the id is
/// assigned and the files are moved.
#[derive(Debug, Clone)]
pub struct NewEpisode {
    pub season_id: i64,
    pub num: i64,
    pub title: String,
    pub subtitle: String,
    pub published_at: DateTime<Utc>,
    pub author: String,
    pub description: String,
    pub audio_duration: i64,
    pub video_url: String,
}
