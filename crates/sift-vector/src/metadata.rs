//! Ordinal-addressed document metadata.

use crate::types::DocumentMetadata;

/// Document metadata in index order.
///
/// Entry `i` describes the vector at ordinal `i` of the paired
/// [`FlatIndex`](crate::index::FlatIndex).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataStore {
    records: Vec<DocumentMetadata>,
}

impl MetadataStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store from records already in ordinal order.
    pub fn from_records(records: Vec<DocumentMetadata>) -> Self {
        Self { records }
    }

    /// Replace every record.
    pub fn replace_all(&mut self, records: Vec<DocumentMetadata>) {
        self.records = records;
    }

    /// Record at `ordinal`.
    pub fn get(&self, ordinal: usize) -> Option<&DocumentMetadata> {
        self.records.get(ordinal)
    }

    /// First record with the given id, with its ordinal.
    pub fn find_by_id(&self, id: &str) -> Option<(usize, &DocumentMetadata)> {
        self.records.iter().enumerate().find(|(_, r)| r.id == id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[DocumentMetadata] {
        &self.records
    }

    pub fn iter(&self) -> impl Iterator<Item = &DocumentMetadata> {
        self.records.iter()
    }
}
