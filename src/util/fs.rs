use std::io::{self, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

/// Atomically replace `path` with `content` using write-to-temp-then-rename.
///
/// The temp file lives next to the destination so the rename never crosses a
/// filesystem. Readers see either the old file or the new one, never a
/// partially written document.
pub fn write_atomic(path: &Path, content: &[u8]) -> io::Result<()> {
    // Randomized temp name so a stale or hostile file cannot be reused
    let random_suffix = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let temp_path = path.with_extension(format!("tmp.{:016x}", random_suffix));

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&temp_path)?;

    let written = file.write_all(content).and_then(|_| file.sync_all());
    drop(file);
    if let Err(e) = written {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e);
    }

    // Windows refuses to rename over an existing file
    #[cfg(windows)]
    if path.exists() {
        if let Err(e) = std::fs::remove_file(path) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(e);
        }
    }

    std::fs::rename(&temp_path, path).inspect_err(|_| {
        let _ = std::fs::remove_file(&temp_path);
    })
}

/// Move a file, falling back to copy + remove when a plain rename fails
/// (typically because source and destination are on different devices).
///
/// The source is only removed once the copy is complete, so a failure never
/// loses the file.
pub async fn move_file(src: &Path, dst: &Path) -> io::Result<()> {
    match tokio::fs::rename(src, dst).await {
        Ok(()) => Ok(()),
        Err(rename_err) => {
            tracing::debug!(
                src = %src.display(),
                dst = %dst.display(),
                error = %rename_err,
                "Rename failed, falling back to copy"
            );
            if let Err(copy_err) = tokio::fs::copy(src, dst).await {
                let _ = tokio::fs::remove_file(dst).await;
                return Err(copy_err);
            }
            tokio::fs::remove_file(src).await
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_atomic_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("podcast.xml");

        write_atomic(&path, b"first").unwrap();
        write_atomic(&path, b"second").unwrap();

        assert_eq!(std::fs::read(&path).unwrap(), b"second");
        // No temp files left behind
        let entries: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn test_write_atomic_missing_parent_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("podcast.xml");
        assert!(write_atomic(&path, b"data").is_err());
    }

    #[tokio::test]
    async fn test_move_file_removes_source() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.mp3");
        let dst = dir.path().join("b.mp3");
        std::fs::write(&src, b"audio").unwrap();

        move_file(&src, &dst).await.unwrap();

        assert!(!src.exists());
        assert_eq!(std::fs::read(&dst).unwrap(), b"audio");
    }

    #[tokio::test]
    async fn test_move_missing_source_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = move_file(&dir.path().join("nope"), &dir.path().join("dst")).await;
        assert!(result.is_err());
        assert!(!dir.path().join("dst").exists());
    }
}
