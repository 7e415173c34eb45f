//! JSON artifact output.
//!
//! Serializes a [`NewsFeed`] to `news.json`. The write goes to a sibling
//! temporary file first and is then renamed over the destination, so a
//! reader sees either the previous artifact or the new one, never a partial
//! file. The previous artifact is replaced in full.

use crate::models::NewsFeed;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;
use tracing::{error, info, instrument, warn};

#[derive(Debug, Error)]
pub enum WriteError {
    #[error("Failed to serialize feed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

fn io_error(path: &Path) -> impl FnOnce(std::io::Error) -> WriteError + '_ {
    move |source| WriteError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Path of the temporary file used while writing `dest`.
pub fn temp_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "news.json".into());
    name.push(".tmp");
    dest.with_file_name(name)
}

/// Write `feed` to `dest` atomically.
///
/// Creates the parent directory if needed.
///
/// # Errors
///
/// Any serialization or I/O failure. The temporary file is removed when
/// either the write or the rename fails; an existing `dest` is left
/// untouched.
#[instrument(level = "info", skip_all, fields(path = %dest.display()))]
pub async fn write_feed(feed: &NewsFeed, dest: &Path) -> Result<(), WriteError> {
    let json = serde_json::to_string_pretty(feed)?;

    if let Some(dir) = dest.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir).await.map_err(io_error(dir))?;
    }

    let tmp = temp_path(dest);
    if let Err(e) = write_then_rename(&tmp, dest, json.as_bytes()).await {
        error!(error = %e, "Failed to write news.json; discarding temporary file");
        if let Err(cleanup) = fs::remove_file(&tmp).await {
            if cleanup.kind() != std::io::ErrorKind::NotFound {
                warn!(path = %tmp.display(), error = %cleanup, "Could not remove temporary file");
            }
        }
        return Err(e);
    }

    info!(articles = feed.len(), bytes = json.len(), "Wrote news.json");
    Ok(())
}

async fn write_then_rename(tmp: &Path, dest: &Path, bytes: &[u8]) -> Result<(), WriteError> {
    fs::write(tmp, bytes).await.map_err(io_error(tmp))?;
    fs::rename(tmp, dest).await.map_err(io_error(dest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, ClassifiedArticle};
    use chrono::Utc;
    use pretty_assertions::assert_eq;

    fn feed_with(headline: &str) -> NewsFeed {
        let mut feed = NewsFeed::new(Utc::now());
        feed.push(ClassifiedArticle {
            headline: headline.into(),
            summary: "S".into(),
            key_points: vec!["k".into()],
            category: Category::World,
        });
        feed
    }

    #[test]
    fn test_temp_path_is_sibling() {
        assert_eq!(
            temp_path(Path::new("/srv/site/news.json")),
            PathBuf::from("/srv/site/news.json.tmp")
        );
    }

    #[tokio::test]
    async fn test_write_feed_creates_file_and_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("public/news.json");

        write_feed(&feed_with("First"), &dest).await.unwrap();

        let text = std::fs::read_to_string(&dest).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["World"][0]["headline"], "First");
        assert!(!temp_path(&dest).exists());
    }

    #[tokio::test]
    async fn test_write_feed_overwrites_previous_artifact() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("news.json");
        std::fs::write(&dest, r#"{"Stale":[{"headline":"old"}]}"#).unwrap();

        write_feed(&feed_with("Fresh"), &dest).await.unwrap();

        let parsed: NewsFeed =
            serde_json::from_str(&std::fs::read_to_string(&dest).unwrap()).unwrap();
        let headlines: Vec<&str> = parsed
            .articles(Category::World)
            .iter()
            .map(|a| a.headline.as_str())
            .collect();
        assert_eq!(headlines, vec!["Fresh"]);
        assert!(parsed.articles(Category::Other).is_empty());
    }

    #[tokio::test]
    async fn test_failed_rename_leaves_no_temp_file() {
        let tmp = tempfile::tempdir().unwrap();
        // A non-empty directory at the destination cannot be replaced by a file
        let dest = tmp.path().join("news.json");
        std::fs::create_dir(&dest).unwrap();
        std::fs::write(dest.join("keep"), "x").unwrap();

        let result = write_feed(&feed_with("X"), &dest).await;

        assert!(matches!(result, Err(WriteError::Io { ref path, .. }) if path == &dest));
        assert!(!temp_path(&dest).exists());
        assert!(dest.join("keep").exists());
    }

    #[tokio::test]
    async fn test_failed_temp_write_reports_temp_path() {
        let tmp = tempfile::tempdir().unwrap();
        let dest = tmp.path().join("news.json");
        // A directory squatting on the temp name makes the write itself fail
        std::fs::create_dir(temp_path(&dest)).unwrap();

        let result = write_feed(&feed_with("X"), &dest).await;

        assert!(matches!(result, Err(WriteError::Io { ref path, .. }) if path == &temp_path(&dest)));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_write_feed_into_missing_parent_fails_cleanly() {
        let tmp = tempfile::tempdir().unwrap();
        // A regular file where a directory is expected
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let dest = blocker.join("news.json");

        let result = write_feed(&feed_with("X"), &dest).await;
        assert!(matches!(result, Err(WriteError::Io { .. })));
    }
}
