use std::io;
use std::path::{Path, PathBuf};

use super::manifest::{TaskManifest, MANIFEST_FILE_NAME};

/// One submission found in the pull directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportTask {
    pub base_dir: PathBuf,
    pub manifest: TaskManifest,
}

impl ImportTask {
    pub fn audio_path(&self) -> PathBuf {
        self.base_dir.join(&self.manifest.audio_file)
    }

    pub fn image_path(&self) -> Option<PathBuf> {
        self.manifest.image().map(|image| self.base_dir.join(image))
    }

    fn dir_name(&self) -> &std::ffi::OsStr {
        self.base_dir.file_name().unwrap_or_default()
    }
}

/// Lists the task directories directly below `dir`.
///
/// Subdirectories without a readable, well-formed manifest are logged and
/// skipped; only failing to read `dir` itself is an error. Tasks come back
/// oldest publish date first, with the directory name as tie-breaker, which
/// is the order episode ordinals are handed out in.
pub async fn scan(dir: &Path) -> io::Result<Vec<ImportTask>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut tasks = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        let is_dir = match entry.file_type().await {
            Ok(ft) => ft.is_dir(),
            Err(e) => {
                tracing::warn!(path = %entry.path().display(), error = %e, "Cannot stat pull entry, skipping");
                continue;
            }
        };
        if !is_dir {
            continue;
        }

        let base_dir = entry.path();
        match read_manifest(&base_dir).await {
            Ok(manifest) => tasks.push(ImportTask { base_dir, manifest }),
            Err(reason) => {
                tracing::warn!(
                    dir = %base_dir.display(),
                    reason = %reason,
                    "Skipping task directory"
                );
            }
        }
    }

    tasks.sort_by(|a, b| {
        a.manifest
            .publish_date()
            .cmp(&b.manifest.publish_date())
            .then_with(|| a.dir_name().cmp(b.dir_name()))
    });
    Ok(tasks)
}

async fn read_manifest(base_dir: &Path) -> Result<TaskManifest, String> {
    let path = base_dir.join(MANIFEST_FILE_NAME);
    let content = tokio::fs::read(&path)
        .await
        .map_err(|e| format!("cannot read {MANIFEST_FILE_NAME}: {e}"))?;
    serde_json::from_slice(&content).map_err(|e| format!("malformed {MANIFEST_FILE_NAME}: {e}"))
}
