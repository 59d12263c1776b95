pub mod client;
pub mod feed;

use crate::artifact::ArtifactId;
use serde::Serialize;
use std::collections::BTreeMap;

pub use client::CatalogClient;
pub use feed::parse_feed;

/// Metadata for one paper in the remote catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub id: ArtifactId,
    pub title: String,
    /// Publication timestamp as reported by the feed
    pub published: String,
    pub authors: Vec<String>,
}

impl CatalogEntry {
    /// Calendar date of publication, when the feed timestamp is RFC 3339
    #[must_use]
    pub fn published_date(&self) -> Option<chrono::NaiveDate> {
        chrono::DateTime::parse_from_rfc3339(self.published.trim())
            .ok()
            .map(|ts| ts.date_naive())
    }
}

/// Parsed result of a catalog query, keyed by artifact ID
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Catalog {
    entries: BTreeMap<ArtifactId, CatalogEntry>,
}

impl Catalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry, replacing any previous entry with the same ID
    pub fn insert(&mut self, entry: CatalogEntry) {
        self.entries.insert(entry.id.clone(), entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[must_use]
    pub fn get(&self, id: &ArtifactId) -> Option<&CatalogEntry> {
        self.entries.get(id)
    }

    #[must_use]
    pub fn contains(&self, id: &ArtifactId) -> bool {
        self.entries.contains_key(id)
    }

    pub fn ids(&self) -> impl Iterator<Item = &ArtifactId> {
        self.entries.keys()
    }

    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.entries.values()
    }
}

impl FromIterator<CatalogEntry> for Catalog {
    fn from_iter<T: IntoIterator<Item = CatalogEntry>>(iter: T) -> Self {
        let mut catalog = Self::new();
        for entry in iter {
            catalog.insert(entry);
        }
        catalog
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = (&'a ArtifactId, &'a CatalogEntry);
    type IntoIter = std::collections::btree_map::Iter<'a, ArtifactId, CatalogEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
