use std::path::{Component, Path};

use chrono::{DateTime, Utc};
use serde::Deserialize;
use thiserror::Error;

/// Name of the manifest file inside each task directory.
pub const MANIFEST_FILE_NAME: &str = "task.json";

const IMAGE_EXTENSION: &str = ".png";

/// Why a manifest cannot be imported.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ManifestError {
    #[error("no podcast key provided")]
    MissingPodcastKey,
    #[error("no season key provided")]
    MissingSeasonKey,
    #[error("no title provided")]
    MissingTitle,
    #[error("no publish date provided")]
    MissingDate,
    #[error("no audio file name provided")]
    MissingAudioFile,
    #[error("image file {0:?} must be a .png")]
    ImageNotPng(String),
    #[error("file name {0:?} must name a file inside the task directory")]
    UnsafeFileName(String),
}

/// Episode submission as written by whoever drops files into the pull
/// directory.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TaskManifest {
    pub podcast_key: String,
    pub season_key: String,
    pub title: String,
    #[serde(rename = "sub_title")]
    pub subtitle: String,
    pub date: Option<DateTime<Utc>>,
    pub author: String,
    pub description: String,
    #[serde(rename = "mp3_file")]
    pub audio_file: String,
    #[serde(rename = "image_file")]
    pub image_file: Option<String>,
    #[serde(rename = "yt_url")]
    pub video_url: Option<String>,
}

impl TaskManifest {
    /// Pure field checks; runs before any file or catalog access.
    pub fn validate(&self) -> Result<(), ManifestError> {
        if self.podcast_key.is_empty() {
            return Err(ManifestError::MissingPodcastKey);
        }
        if self.season_key.is_empty() {
            return Err(ManifestError::MissingSeasonKey);
        }
        if self.title.is_empty() {
            return Err(ManifestError::MissingTitle);
        }
        if self.publish_date().is_none() {
            return Err(ManifestError::MissingDate);
        }
        if self.audio_file.is_empty() {
            return Err(ManifestError::MissingAudioFile);
        }
        check_file_name(&self.audio_file)?;
        if let Some(image) = self.image() {
            check_file_name(image)?;
            if !image.to_ascii_lowercase().ends_with(IMAGE_EXTENSION) {
                return Err(ManifestError::ImageNotPng(image.to_string()));
            }
        }
        Ok(())
    }

    /// Publish date, treating the `0001-01-01T00:00:00Z` zero value as unset.
    pub fn publish_date(&self) -> Option<DateTime<Utc>> {
        self.date.filter(|d| d.timestamp() != ZERO_TIME)
    }

    /// Image file name, if one was given.
    pub fn image(&self) -> Option<&str> {
        self.image_file.as_deref().filter(|s| !s.is_empty())
    }

    pub fn video_url(&self) -> &str {
        self.video_url.as_deref().unwrap_or_default()
    }

    /// Author, defaulting to `Unknown`.
    pub fn author(&self) -> &str {
        if self.author.trim().is_empty() {
            "Unknown"
        } else {
            &self.author
        }
    }
}

/// Accepts only a bare file name, so task files resolve inside the task
/// directory.
fn check_file_name(name: &str) -> Result<(), ManifestError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(_)), None) => Ok(()),
        _ => Err(ManifestError::UnsafeFileName(name.to_string())),
    }
}

/// Unix timestamp of `0001-01-01T00:00:00Z`.
const ZERO_TIME: i64 = -62_135_596_800;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use pretty_assertions::assert_eq;

    fn valid() -> TaskManifest {
        TaskManifest {
            podcast_key: "sermons".to_string(),
            season_key: "2023".to_string(),
            title: "Grace".to_string(),
            date: Some(Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap()),
            audio_file: "grace.mp3".to_string(),
            ..TaskManifest::default()
        }
    }

    #[test]
    fn test_parse_manifest_json() {
        let json = r#"{
            "podcast_key": "sermons",
            "season_key": "2023",
            "title": "Grace",
            "sub_title": "Part Two",
            "date": "2023-05-01T12:00:00+02:00",
            "author": "Pastor Kim",
            "description": "On grace",
            "mp3_file": "grace.mp3",
            "image_file": "thumb.png",
            "yt_url": "https://video.example.org/abc"
        }"#;
        let manifest: TaskManifest = serde_json::from_str(json).unwrap();

        assert_eq!(manifest.subtitle, "Part Two");
        assert_eq!(
            manifest.publish_date(),
            Some(Utc.with_ymd_and_hms(2023, 5, 1, 10, 0, 0).unwrap())
        );
        assert_eq!(manifest.audio_file, "grace.mp3");
        assert_eq!(manifest.image(), Some("thumb.png"));
        assert_eq!(manifest.video_url(), "https://video.example.org/abc");
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_missing_optional_fields_default() {
        let json = r#"{"podcast_key":"p","season_key":"s","title":"t","date":"2023-01-01T00:00:00Z","mp3_file":"a.mp3"}"#;
        let manifest: TaskManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.image(), None);
        assert_eq!(manifest.video_url(), "");
        assert_eq!(manifest.author(), "Unknown");
        assert!(manifest.validate().is_ok());
    }

    fn assert_rejected(mutate: impl FnOnce(&mut TaskManifest), expected: ManifestError) {
        let mut manifest = valid();
        mutate(&mut manifest);
        assert_eq!(manifest.validate(), Err(expected));
    }

    #[test]
    fn test_required_fields() {
        assert_rejected(|m| m.podcast_key.clear(), ManifestError::MissingPodcastKey);
        assert_rejected(|m| m.season_key.clear(), ManifestError::MissingSeasonKey);
        assert_rejected(|m| m.title.clear(), ManifestError::MissingTitle);
        assert_rejected(|m| m.date = None, ManifestError::MissingDate);
        assert_rejected(|m| m.audio_file.clear(), ManifestError::MissingAudioFile);
    }

    #[test]
    fn test_zero_date_is_unset() {
        let json = r#"{"podcast_key":"p","season_key":"s","title":"t","date":"0001-01-01T00:00:00Z","mp3_file":"a.mp3"}"#;
        let manifest: TaskManifest = serde_json::from_str(json).unwrap();
        assert_eq!(manifest.publish_date(), None);
        assert_eq!(manifest.validate(), Err(ManifestError::MissingDate));
    }

    #[test]
    fn test_image_extension() {
        let mut manifest = valid();
        manifest.image_file = Some("cover.jpg".to_string());
        assert_eq!(
            manifest.validate(),
            Err(ManifestError::ImageNotPng("cover.jpg".to_string()))
        );

        manifest.image_file = Some("COVER.PNG".to_string());
        assert!(manifest.validate().is_ok());

        manifest.image_file = Some(String::new());
        assert!(manifest.validate().is_ok());
    }

    #[test]
    fn test_file_names_must_stay_in_task_dir() {
        for name in ["../../private.wav", "/etc/passwd", "sub/grace.mp3", "..", "."] {
            assert_rejected(
                |m| m.audio_file = name.to_string(),
                ManifestError::UnsafeFileName(name.to_string()),
            );
        }
        assert_rejected(
            |m| m.image_file = Some("../cover.png".to_string()),
            ManifestError::UnsafeFileName("../cover.png".to_string()),
        );

        assert_rejected(
            |m| m.audio_file = "./grace.mp3".to_string(),
            ManifestError::UnsafeFileName("./grace.mp3".to_string()),
        );
    }
}
