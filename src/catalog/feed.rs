//! Atom feed decoding.
//!
//! Entries and authors decode into `Vec`s, so a feed holding a single
//! `<entry>` (or an entry with a single `<author>`) takes the same path as
//! one holding many. Elements the catalog does not model, such as
//! `arxiv:affiliation`, `link` or `summary`, are skipped by the decoder.

use super::{Catalog, CatalogEntry};
use crate::artifact::ArtifactId;
use crate::error::QueryError;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Feed {
    /// Every Atom feed carries a feed-level id; its absence means the body is not a feed
    #[allow(dead_code)]
    id: String,
    #[serde(rename = "entry", default)]
    entries: Vec<FeedEntry>,
}

#[derive(Debug, Deserialize)]
struct FeedEntry {
    id: String,
    title: String,
    #[serde(default)]
    published: String,
    #[serde(rename = "author", default)]
    authors: Vec<FeedAuthor>,
}

#[derive(Debug, Deserialize)]
struct FeedAuthor {
    name: String,
}

/// Parse a catalog feed body into a [`Catalog`]
pub fn parse_feed(xml: &str) -> Result<Catalog, QueryError> {
    let feed: Feed =
        quick_xml::de::from_str(xml).map_err(|e| QueryError::Unparseable(e.to_string()))?;

    if feed.entries.is_empty() {
        tracing::info!("No entries found");
    }

    feed.entries
        .into_iter()
        .map(FeedEntry::into_catalog_entry)
        .collect()
}

impl FeedEntry {
    fn into_catalog_entry(self) -> Result<CatalogEntry, QueryError> {
        let id = id_from_url(&self.id).ok_or_else(|| {
            QueryError::Unparseable(format!("entry id '{}' has no identifier segment", self.id))
        })?;

        Ok(CatalogEntry {
            id,
            title: normalize_whitespace(&self.title),
            published: self.published.trim().to_string(),
            authors: self
                .authors
                .into_iter()
                .map(|a| normalize_whitespace(&a.name))
                .collect(),
        })
    }
}

/// Last path segment of an entry's URL-form id, e.g. `http://arxiv.org/abs/2101.00001v1`
fn id_from_url(url: &str) -> Option<ArtifactId> {
    url.trim()
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|segment| !segment.is_empty())
        .map(ArtifactId::from)
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
pub(crate) mod fixtures {
    /// Build an Atom feed around the given entry fragments
    pub fn feed(entries: &[String]) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:opensearch="http://a9.com/-/spec/opensearch/1.1/" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <link href="http://arxiv.org/api/query" rel="self" type="application/atom+xml"/>
  <title type="html">ArXiv Query</title>
  <id>http://arxiv.org/api/cHxbiOdZaP56ODnBPIenZhzg5f8</id>
  <updated>2024-01-01T00:00:00-05:00</updated>
  <opensearch:totalResults>{}</opensearch:totalResults>
  <opensearch:startIndex>0</opensearch:startIndex>
  <opensearch:itemsPerPage>10</opensearch:itemsPerPage>
{}
</feed>"#,
            entries.len(),
            entries.join("\n")
        )
    }

    /// One `<entry>` with the given id, title and authors
    pub fn entry(id: &str, title: &str, authors: &[&str]) -> String {
        let authors: String = authors
            .iter()
            .map(|name| {
                format!(
                    "    <author>\n      <name>{name}</name>\n      <arxiv:affiliation>Somewhere</arxiv:affiliation>\n    </author>\n"
                )
            })
            .collect();
        format!(
            r#"  <entry>
    <id>http://arxiv.org/abs/{id}</id>
    <updated>2021-01-02T00:00:00Z</updated>
    <published>2021-01-01T18:59:59Z</published>
    <title>{title}</title>
    <summary>An abstract.</summary>
{authors}    <link href="http://arxiv.org/abs/{id}" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/{id}" rel="related" type="application/pdf"/>
    <arxiv:primary_category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.CL" scheme="http://arxiv.org/schemas/atom"/>
  </entry>"#
        )
    }
}
