//! Canonical on-disk layout below the podcast directory.
//!
//! ```text
//! {podcast_id}/podcast.xml
//! {podcast_id}/{YYYYMMDD_HHMMSS}_{episode_id}/{episode_id}_{title}.mp3
//! {podcast_id}/{YYYYMMDD_HHMMSS}_{episode_id}/thumb.png
//! ```
//!
//! Locations are relative and `/`-separated. They are stored in the catalog
//! as-is and double as URL paths below the static content base.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

pub const FEED_FILE_NAME: &str = "podcast.xml";
pub const IMAGE_FILE_NAME: &str = "thumb.png";

const FOLDER_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

pub fn podcast_folder(podcast_id: i64) -> String {
    podcast_id.to_string()
}

/// Absolute path of a podcast's feed document.
pub fn feed_path(podcast_dir: &Path, podcast_id: i64) -> PathBuf {
    podcast_dir
        .join(podcast_folder(podcast_id))
        .join(FEED_FILE_NAME)
}

/// Where an episode's files live once imported.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeLayout {
    pub folder: String,
    pub audio: String,
    pub image: String,
}

impl EpisodeLayout {
    pub fn new(podcast_id: i64, episode_id: i64, published_at: DateTime<Utc>, title: &str) -> Self {
        let folder = format!(
            "{}/{}_{}",
            podcast_folder(podcast_id),
            published_at.format(FOLDER_TIMESTAMP_FORMAT),
            episode_id
        );
        let audio = format!("{folder}/{episode_id}_{}.mp3", sanitize_title(title));
        let image = format!("{folder}/{IMAGE_FILE_NAME}");
        Self {
            folder,
            audio,
            image,
        }
    }

    /// Resolves a relative location against the podcast directory.
    pub fn resolve(podcast_dir: &Path, location: &str) -> PathBuf {
        podcast_dir.join(location)
    }
}

/// Spaces become underscores; anything outside `[A-Za-z0-9_]` is dropped.
pub fn sanitize_title(title: &str) -> String {
    title
        .chars()
        .filter_map(|c| match c {
            ' ' => Some('_'),
            c if c.is_ascii_alphanumeric() || c == '_' => Some(c),
            _ => None,
        })
        .collect()
}
