//! Persistence and freshness checking for the vector store.
//!
//! A store is saved as two files:
//!
//! - the **index file**, a little-endian binary dump of the normalized vectors
//!   (`SIFTVEC\0` magic, format version, dimension, count, then
//!   `count * dimension` `f32` values)
//! - the **metadata file**, a JSON envelope holding the document records in
//!   ordinal order, the build provenance, a content hash over the indexed
//!   documents, and a Blake3 checksum of the index file bytes
//!
//! Both files are written to temporaries in their destination directories and
//! renamed into place, index first. A reader that finds a metadata file whose
//! checksum does not match the index file treats the pair as corrupt.

use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sift_core::util::paths::{ensure_parent_dir, parent_dir};
use sift_core::{Error, Result};
use tempfile::NamedTempFile;

use crate::index::FlatIndex;
use crate::metadata::MetadataStore;
use crate::types::{Document, DocumentMetadata};

/// Leading bytes of every index file.
pub const INDEX_MAGIC: &[u8; 8] = b"SIFTVEC\0";

/// Current index file format version.
pub const INDEX_FORMAT_VERSION: u32 = 1;

/// Current metadata envelope version.
pub const METADATA_FORMAT_VERSION: u32 = 1;

const HEADER_LEN: usize = 8 + 4 + 4 + 8;

// ============================================================================
// Metadata envelope
// ============================================================================

/// JSON envelope stored in the metadata file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataFile {
    /// Envelope format version.
    pub version: u32,

    /// Number of indexed documents.
    pub document_count: usize,

    /// Embedding dimension.
    pub embedding_dimension: usize,

    /// Embedding provider name.
    pub provider: String,

    /// Build timestamp.
    pub built_at: DateTime<Utc>,

    /// Content hash of the indexed documents at build time.
    pub content_hash: String,

    /// Blake3 checksum of the index file bytes.
    pub index_checksum: String,

    /// Document records in ordinal order.
    pub documents: Vec<DocumentMetadata>,
}

/// Provenance recorded when a store is saved.
#[derive(Debug, Clone, PartialEq)]
pub struct BuildInfo {
    pub provider: String,
    pub content_hash: String,
    pub built_at: DateTime<Utc>,
}

/// A store read back from disk.
#[derive(Debug, Clone)]
pub struct PersistedStore {
    pub index: FlatIndex,
    pub metadata: MetadataStore,
    pub info: BuildInfo,
}

/// Result of reading a saved store.
#[derive(Debug, Clone)]
pub enum LoadOutcome {
    /// Both files were read and agree with each other.
    Loaded(PersistedStore),

    /// One or both files do not exist.
    Absent,

    /// The files exist but could not be used.
    Corrupt(String),
}

// ============================================================================
// Hashing
// ============================================================================

/// Compute a Blake3 hash over document ids and texts, in order.
pub fn compute_content_hash(documents: &[Document]) -> String {
    let mut hasher = blake3::Hasher::new();
    for doc in documents {
        for field in [doc.id.as_bytes(), doc.text.as_bytes()] {
            hasher.update(&(field.len() as u64).to_le_bytes());
            hasher.update(field);
        }
    }
    hasher.finalize().to_hex().to_string()
}

fn checksum(bytes: &[u8]) -> String {
    blake3::hash(bytes).to_hex().to_string()
}

/// Check if a saved store was built from the given content hash by the
/// named embedding provider.
///
/// Returns `false` when the metadata file is missing or unreadable.
pub fn is_index_fresh(metadata_path: &Path, current_hash: &str, provider: &str) -> bool {
    match load_metadata_file(metadata_path) {
        Ok(metadata) => metadata.content_hash == current_hash && metadata.provider == provider,
        Err(_) => false,
    }
}

// ============================================================================
// Index codec
// ============================================================================

/// Serialize an index to its binary file form.
pub fn encode_index(index: &FlatIndex) -> Vec<u8> {
    let values = index.as_slice();
    let mut bytes = Vec::with_capacity(HEADER_LEN + values.len() * 4);
    bytes.extend_from_slice(INDEX_MAGIC);
    bytes.extend_from_slice(&INDEX_FORMAT_VERSION.to_le_bytes());
    bytes.extend_from_slice(&(index.dimension() as u32).to_le_bytes());
    bytes.extend_from_slice(&(index.len() as u64).to_le_bytes());
    for value in values {
        bytes.extend_from_slice(&value.to_le_bytes());
    }
    bytes
}

/// Parse an index from its binary file form.
///
/// # Errors
///
/// Returns `Error::InvalidData` for a bad magic, an unsupported version,
/// or a body whose length disagrees with the header.
pub fn decode_index(bytes: &[u8]) -> Result<FlatIndex> {
    if bytes.len() < HEADER_LEN {
        return Err(Error::invalid_data("index file is truncated"));
    }
    if &bytes[..8] != INDEX_MAGIC {
        return Err(Error::invalid_data("index file has an unknown format"));
    }

    let version = read_u32(&bytes[8..12]);
    if version != INDEX_FORMAT_VERSION {
        return Err(Error::invalid_data(format!(
            "unsupported index format version {version}"
        )));
    }
    let dimension = read_u32(&bytes[12..16]) as usize;
    let count = read_u64(&bytes[16..24]);

    let body = &bytes[HEADER_LEN..];
    let expected = usize::try_from(count)
        .ok()
        .and_then(|c| c.checked_mul(dimension))
        .and_then(|n| n.checked_mul(4))
        .ok_or_else(|| Error::invalid_data("index header overflows"))?;
    if body.len() != expected {
        return Err(Error::invalid_data(format!(
            "index body holds {} bytes, header promises {expected}",
            body.len()
        )));
    }
    if dimension == 0 && count > 0 {
        return Err(Error::invalid_data("index header has dimension 0"));
    }

    let data = body
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    FlatIndex::from_raw_parts(dimension, data)
}

fn read_u32(bytes: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(bytes);
    u32::from_le_bytes(buf)
}

fn read_u64(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    u64::from_le_bytes(buf)
}

// ============================================================================
// Save / load
// ============================================================================

/// Save an index and its metadata, replacing any previous pair.
pub fn save_pair(
    index: &FlatIndex,
    metadata: &MetadataStore,
    info: &BuildInfo,
    index_path: &Path,
    metadata_path: &Path,
) -> Result<()> {
    let index_bytes = encode_index(index);
    let envelope = MetadataFile {
        version: METADATA_FORMAT_VERSION,
        document_count: metadata.len(),
        embedding_dimension: index.dimension(),
        provider: info.provider.clone(),
        built_at: info.built_at,
        content_hash: info.content_hash.clone(),
        index_checksum: checksum(&index_bytes),
        documents: metadata.records().to_vec(),
    };
    let json = serde_json::to_string_pretty(&envelope)?;

    ensure_parent_dir(index_path)?;
    ensure_parent_dir(metadata_path)?;
    let index_tmp = write_temp(index_path, &index_bytes)?;
    let metadata_tmp = write_temp(metadata_path, json.as_bytes())?;

    index_tmp
        .persist(index_path)
        .map_err(|e| Error::io_with_path(e.error, index_path))?;
    metadata_tmp
        .persist(metadata_path)
        .map_err(|e| Error::io_with_path(e.error, metadata_path))?;

    log::debug!(
        "Saved {} vectors to {} and metadata to {}",
        index.len(),
        index_path.display(),
        metadata_path.display()
    );
    Ok(())
}

fn write_temp(destination: &Path, bytes: &[u8]) -> Result<NamedTempFile> {
    let dir = parent_dir(destination);
    let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| Error::io_with_path(e, &dir))?;
    tmp.write_all(bytes)
        .and_then(|_| tmp.as_file().sync_all())
        .map_err(|e| Error::io_with_path(e, tmp.path()))?;
    Ok(tmp)
}

/// Load the metadata envelope on its own.
pub fn load_metadata_file(metadata_path: &Path) -> Result<MetadataFile> {
    let json = std::fs::read_to_string(metadata_path)
        .map_err(|e| Error::io_with_path(e, metadata_path))?;
    let metadata: MetadataFile = serde_json::from_str(&json)?;
    Ok(metadata)
}

/// Load a saved index and metadata pair.
///
/// Never fails: missing files yield [`LoadOutcome::Absent`], anything
/// unreadable or inconsistent yields [`LoadOutcome::Corrupt`].
pub fn load_pair(index_path: &Path, metadata_path: &Path) -> LoadOutcome {
    if !index_path.exists() || !metadata_path.exists() {
        return LoadOutcome::Absent;
    }
    match read_pair(index_path, metadata_path) {
        Ok(store) => LoadOutcome::Loaded(store),
        Err(e) => LoadOutcome::Corrupt(e.to_string()),
    }
}

fn read_pair(index_path: &Path, metadata_path: &Path) -> Result<PersistedStore> {
    let bytes = std::fs::read(index_path).map_err(|e| Error::io_with_path(e, index_path))?;
    let envelope = load_metadata_file(metadata_path)?;

    if envelope.version != METADATA_FORMAT_VERSION {
        return Err(Error::invalid_data(format!(
            "unsupported metadata version {}",
            envelope.version
        )));
    }
    if envelope.index_checksum != checksum(&bytes) {
        return Err(Error::invalid_data(
            "index file does not match the checksum recorded in metadata",
        ));
    }

    let index = decode_index(&bytes)?;
    if index.len() != envelope.documents.len() || envelope.document_count != index.len() {
        return Err(Error::invalid_data(format!(
            "index holds {} vectors but metadata lists {} documents",
            index.len(),
            envelope.documents.len()
        )));
    }
    if !index.is_empty() && index.dimension() != envelope.embedding_dimension {
        return Err(Error::InvalidDimension {
            expected: envelope.embedding_dimension,
            actual: index.dimension(),
        });
    }

    Ok(PersistedStore {
        index,
        metadata: MetadataStore::from_records(envelope.documents),
        info: BuildInfo {
            provider: envelope.provider,
            content_hash: envelope.content_hash,
            built_at: envelope.built_at,
        },
    })
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn sample() -> (FlatIndex, MetadataStore, BuildInfo) {
        let docs = vec![
            Document::new("a.md", "disk full").with_title("A"),
            Document::new("b.md", "login typo").with_title("B"),
        ];
        let index = FlatIndex::build(vec![vec![1.0, 0.0, 0.0], vec![0.0, 3.0, 4.0]]).unwrap();
        let metadata = MetadataStore::from_records(docs.iter().map(Document::metadata).collect());
        let info = BuildInfo {
            provider: "mock".to_string(),
            content_hash: compute_content_hash(&docs),
            built_at: Utc::now(),
        };
        (index, metadata, info)
    }

    #[test]
    fn test_encode_layout() {
        let (index, _, _) = sample();
        let bytes = encode_index(&index);

        assert_eq!(&bytes[..8], INDEX_MAGIC);
        assert_eq!(read_u32(&bytes[8..12]), 1);
        assert_eq!(read_u32(&bytes[12..16]), 3);
        assert_eq!(read_u64(&bytes[16..24]), 2);
        assert_eq!(bytes.len(), HEADER_LEN + 2 * 3 * 4);
    }

    #[test]
    fn test_decode_preserves_vectors() {
        let (index, _, _) = sample();
        let decoded = decode_index(&encode_index(&index)).unwrap();
        assert_eq!(decoded, index);
    }

    #[test]
    fn test_decode_rejects_bad_magic() {
        let (index, _, _) = sample();
        let mut bytes = encode_index(&index);
        bytes[0] = b'X';
        assert!(decode_index(&bytes).unwrap_err().to_string().contains("unknown format"));
    }

    #[test]
    fn test_decode_rejects_truncated_body() {
        let (index, _, _) = sample();
        let mut bytes = encode_index(&index);
        bytes.truncate(bytes.len() - 4);
        assert!(decode_index(&bytes).is_err());
        assert!(decode_index(&bytes[..10]).is_err());
    }

    #[test]
    fn test_decode_rejects_future_version() {
        let (index, _, _) = sample();
        let mut bytes = encode_index(&index);
        bytes[8..12].copy_from_slice(&2u32.to_le_bytes());
        assert!(decode_index(&bytes).is_err());
    }

    #[test]
    fn test_save_and_load_pair() {
        let dir = tempdir().unwrap();
        let index_path = dir.path().join("store/vector_store.idx");
        let metadata_path = dir.path().join("store/metadata.json");
        let (index, metadata, info) = sample();

        save_pair(&index, &metadata, &info, &index_path, &metadata_path).unwrap();

        match load_pair(&index_path, &metadata_path) {
            LoadOutcome::Loaded(store) => {
                assert_eq!(store.index, index);
                assert_eq!(store.metadata, metadata);
                assert_eq!(store.info, info);
            }
            other => panic!("expected Loaded, got {other:?}"),
        }
    }

    #[test]
    fn test_save_overwrites_previous_pair() {
        let dir = tempdir().unwrap();
        let index_path = dir.path().join("v.idx");
        let metadata_path = dir.path().join("m.json");
        let (index, metadata, info) = sample();

        save_pair(&index, &metadata, &info, &index_path, &metadata_path).unwrap();
        save_pair(
            &FlatIndex::default(),
            &MetadataStore::new(),
            &info,
            &index_path,
            &metadata_path,
        )
        .unwrap();

        match load_pair(&index_path, &metadata_path) {
            LoadOutcome::Loaded(store) => assert!(store.index.is_empty()),
            other => panic!("expected Loaded, got {other:?}"),
        }
    }

    #[test]
    fn test_load_absent() {
        let dir = tempdir().unwrap();
        let outcome = load_pair(&dir.path().join("v.idx"), &dir.path().join("m.json"));
        assert!(matches!(outcome, LoadOutcome::Absent));
    }

    #[test]
    fn test_load_count_mismatch_is_corrupt() {
        let dir = tempdir().unwrap();
        let index_path = dir.path().join("v.idx");
        let metadata_path = dir.path().join("m.json");
        let (index, metadata, info) = sample();
        save_pair(&index, &metadata, &info, &index_path, &metadata_path).unwrap();

        let mut envelope = load_metadata_file(&metadata_path).unwrap();
        envelope.documents.push(Document::new("c.md", "extra").metadata());
        envelope.document_count = 3;
        std::fs::write(&metadata_path, serde_json::to_string(&envelope).unwrap()).unwrap();

        match load_pair(&index_path, &metadata_path) {
            LoadOutcome::Corrupt(reason) => {
                assert!(reason.contains("2 vectors"), "{reason}");
                assert!(reason.contains("3 documents"), "{reason}");
            }
            other => panic!("expected Corrupt, got {other:?}"),
        }
    }

    #[test]
    fn test_load_checksum_mismatch_is_corrupt() {
        let dir = tempdir().unwrap();
        let index_path = dir.path().join("v.idx");
        let metadata_path = dir.path().join("m.json");
        let (index, metadata, info) = sample();
        save_pair(&index, &metadata, &info, &index_path, &metadata_path).unwrap();

        let other = FlatIndex::build(vec![vec![0.0, 1.0, 0.0], vec![0.0, 0.0, 1.0]]).unwrap();
        std::fs::write(&index_path, encode_index(&other)).unwrap();

        assert!(matches!(
            load_pair(&index_path, &metadata_path),
            LoadOutcome::Corrupt(_)
        ));
    }

    #[test]
    fn test_load_garbage_metadata_is_corrupt() {
        let dir = tempdir().unwrap();
        let index_path = dir.path().join("v.idx");
        let metadata_path = dir.path().join("m.json");
        std::fs::write(&index_path, b"whatever").unwrap();
        std::fs::write(&metadata_path, "{not json").unwrap();

        assert!(matches!(
            load_pair(&index_path, &metadata_path),
            LoadOutcome::Corrupt(_)
        ));
    }

    #[test]
    fn test_content_hash() {
        let a = vec![Document::new("a", "one"), Document::new("b", "two")];
        let b = vec![Document::new("a", "one"), Document::new("b", "two")];
        let c = vec![Document::new("a", "one"), Document::new("b", "changed")];
        let shifted = vec![Document::new("ao", "ne"), Document::new("b", "two")];

        assert_eq!(compute_content_hash(&a), compute_content_hash(&b));
        assert_ne!(compute_content_hash(&a), compute_content_hash(&c));
        assert_ne!(compute_content_hash(&a), compute_content_hash(&shifted));
    }

    #[test]
    fn test_is_index_fresh() {
        let dir = tempdir().unwrap();
        let index_path = dir.path().join("v.idx");
        let metadata_path = dir.path().join("m.json");
        let (index, metadata, info) = sample();
        save_pair(&index, &metadata, &info, &index_path, &metadata_path).unwrap();

        assert!(is_index_fresh(&metadata_path, &info.content_hash, &info.provider));
        assert!(!is_index_fresh(&metadata_path, "different", &info.provider));
        assert!(!is_index_fresh(&dir.path().join("missing.json"), "x", "mock"));
    }

    #[test]
    fn test_is_index_fresh_requires_same_provider() {
        let dir = tempdir().unwrap();
        let index_path = dir.path().join("v.idx");
        let metadata_path = dir.path().join("m.json");
        let (index, metadata, info) = sample();
        save_pair(&index, &metadata, &info, &index_path, &metadata_path).unwrap();

        assert!(!is_index_fresh(&metadata_path, &info.content_hash, "all-minilm-l6-v2"));
    }
}
