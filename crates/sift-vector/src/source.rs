//! Document sources.
//!
//! A [`DocumentSource`] produces the full document set that a sync rebuilds
//! the store from. The service ships with [`LocalDirectorySource`], which
//! reads incident write-ups from a flat directory of `.txt` and `.md` files.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sift_core::{Error, Result};

use crate::types::Document;

/// Anything that can list the documents to index.
#[async_trait]
pub trait DocumentSource: Send + Sync {
    /// Fetch every document currently available.
    async fn fetch_documents(&self) -> Result<Vec<Document>>;

    /// Source name for diagnostics.
    fn name(&self) -> &str;
}

// ============================================================================
// Local directory
// ============================================================================

/// File extensions picked up by [`LocalDirectorySource`].
pub const SUPPORTED_EXTENSIONS: &[&str] = &["txt", "md"];

/// Reads `.txt` and `.md` files from a single directory (not recursive).
///
/// Each file becomes one document:
///
/// | field | value |
/// |-------|-------|
/// | `id` | file name |
/// | `title` | file stem, `_` replaced by spaces, title-cased |
/// | `origin_uri` | `local_file://<file name>` |
/// | `last_modified` | file modification time (UTC) |
///
/// Files that cannot be read are logged and skipped.
#[derive(Debug, Clone)]
pub struct LocalDirectorySource {
    data_path: PathBuf,
}

impl LocalDirectorySource {
    /// Create a source over `data_path`, creating the directory if missing.
    pub fn new(data_path: impl Into<PathBuf>) -> Result<Self> {
        let data_path = data_path.into();
        if !data_path.exists() {
            log::info!(
                "Data directory {} not found. Creating it.",
                data_path.display()
            );
            std::fs::create_dir_all(&data_path)
                .map_err(|e| Error::io_with_path(e, &data_path))?;
        }
        Ok(Self { data_path })
    }

    pub fn data_path(&self) -> &Path {
        &self.data_path
    }

    async fn read_document(path: &Path, file_name: &str) -> Result<Document> {
        let text = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| Error::io_with_path(e, path))?;
        let modified = tokio::fs::metadata(path)
            .await
            .and_then(|m| m.modified())
            .map_err(|e| Error::io_with_path(e, path))?;

        let stem = Path::new(file_name)
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| file_name.to_string());

        Ok(Document::new(file_name, text)
            .with_title(title_from_stem(&stem))
            .with_origin_uri(format!("local_file://{file_name}"))
            .with_last_modified(DateTime::<Utc>::from(modified)))
    }
}

#[async_trait]
impl DocumentSource for LocalDirectorySource {
    async fn fetch_documents(&self) -> Result<Vec<Document>> {
        log::info!("Fetching documents from {}", self.data_path.display());

        let mut entries = tokio::fs::read_dir(&self.data_path)
            .await
            .map_err(|e| Error::io_with_path(e, &self.data_path))?;

        let mut documents = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| Error::io_with_path(e, &self.data_path))?
        {
            let path = entry.path();
            if !path.is_file() || !has_supported_extension(&path) {
                continue;
            }
            let file_name = entry.file_name().to_string_lossy().into_owned();

            match Self::read_document(&path, &file_name).await {
                Ok(doc) => documents.push(doc),
                Err(e) => log::warn!("Skipping {file_name}: {e}"),
            }
        }

        documents.sort_by(|a, b| a.id.cmp(&b.id));
        log::info!("Fetched {} local documents", documents.len());
        Ok(documents)
    }

    fn name(&self) -> &str {
        "local_directory"
    }
}

fn has_supported_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| SUPPORTED_EXTENSIONS.contains(&e))
}

/// Turn a file stem into a display title: `db_outage-2` -> `Db Outage-2`.
///
/// Underscores become spaces; each run of letters starts upper-case and
/// continues lower-case.
pub fn title_from_stem(stem: &str) -> String {
    let mut title = String::with_capacity(stem.len());
    let mut in_word = false;
    for c in stem.chars().map(|c| if c == '_' { ' ' } else { c }) {
        if c.is_alphabetic() {
            if in_word {
                title.extend(c.to_lowercase());
            } else {
                title.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            title.push(c);
            in_word = false;
        }
    }
    title
}

// ============================================================================
// Static
// ============================================================================

/// A fixed in-memory document list.
#[derive(Debug, Clone, Default)]
pub struct StaticDocumentSource {
    documents: Vec<Document>,
}

impl StaticDocumentSource {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }
}

#[async_trait]
impl DocumentSource for StaticDocumentSource {
    async fn fetch_documents(&self) -> Result<Vec<Document>> {
        Ok(self.documents.clone())
    }

    fn name(&self) -> &str {
        "static"
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_title_from_stem() {
        assert_eq!(title_from_stem("db_outage_disk_full"), "Db Outage Disk Full");
        assert_eq!(title_from_stem("LOGIN_bug"), "Login Bug");
        assert_eq!(title_from_stem("api-timeout_2x"), "Api-Timeout 2X");
        assert_eq!(title_from_stem(""), "");
    }

    #[test]
    fn test_new_creates_missing_directory() {
        let dir = tempdir().unwrap();
        let data = dir.path().join("local_data");
        let source = LocalDirectorySource::new(&data).unwrap();

        assert!(data.is_dir());
        assert_eq!(source.data_path(), data.as_path());
    }

    #[tokio::test]
    async fn test_fetch_reads_supported_files_sorted() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("network_blip.txt"), "packet loss").unwrap();
        std::fs::write(dir.path().join("disk_full.md"), "DB outage due to disk full").unwrap();
        std::fs::write(dir.path().join("image.png"), [0u8, 1, 2]).unwrap();
        std::fs::create_dir(dir.path().join("nested.md")).unwrap();

        let source = LocalDirectorySource::new(dir.path()).unwrap();
        let docs = source.fetch_documents().await.unwrap();

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].id, "disk_full.md");
        assert_eq!(docs[0].title, "Disk Full");
        assert_eq!(docs[0].origin_uri, "local_file://disk_full.md");
        assert_eq!(docs[0].text, "DB outage due to disk full");
        assert_eq!(docs[1].id, "network_blip.txt");
    }

    #[tokio::test]
    async fn test_fetch_skips_unreadable_files() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("good.txt"), "fine").unwrap();
        std::fs::write(dir.path().join("bad.txt"), [0xff, 0xfe, 0xfd]).unwrap();

        let source = LocalDirectorySource::new(dir.path()).unwrap();
        let docs = source.fetch_documents().await.unwrap();

        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].id, "good.txt");
    }

    #[tokio::test]
    async fn test_fetch_empty_directory() {
        let dir = tempdir().unwrap();
        let source = LocalDirectorySource::new(dir.path()).unwrap();
        assert!(source.fetch_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_static_source() {
        let source = StaticDocumentSource::new(vec![Document::new("a", "x")]);
        assert_eq!(source.fetch_documents().await.unwrap().len(), 1);
        assert_eq!(source.name(), "static");
    }
}
