use super::{parse_feed, Catalog};
use crate::artifact::ArtifactId;
use crate::config::schema::CatalogConfig;
use crate::error::{DocshelfError, QueryError, Result};
use std::time::Duration;

/// Client for the remote paper catalog feed
#[derive(Debug, Clone)]
pub struct CatalogClient {
    http: reqwest::Client,
    endpoint: String,
    pdf_host: String,
}

impl CatalogClient {
    /// Create new catalog client from config
    pub fn new(config: &CatalogConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DocshelfError::Config(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.clone(),
            pdf_host: config.pdf_host.trim_end_matches('/').to_string(),
        })
    }

    /// Search the catalog by keyword.
    ///
    /// `start_index` and `max_results` are passed through unchecked; callers
    /// keep them in `start_index >= 1` and `1..=1000`.
    pub async fn query_by_keyword(
        &self,
        keyword: Option<&str>,
        start_index: u32,
        max_results: u32,
    ) -> std::result::Result<Catalog, QueryError> {
        let search_query = match keyword.map(str::trim) {
            Some(k) if !k.is_empty() => format!("all:{k}"),
            _ => "all".to_string(),
        };

        self.fetch_feed(&[
            ("search_query", search_query),
            ("start", start_index.to_string()),
            ("max_results", max_results.to_string()),
        ])
        .await
    }

    /// Fetch metadata for a known set of IDs
    pub async fn query_by_ids<'a, I>(&self, ids: I) -> std::result::Result<Catalog, QueryError>
    where
        I: IntoIterator<Item = &'a ArtifactId>,
    {
        let ids: Vec<&str> = ids.into_iter().map(ArtifactId::as_str).collect();
        if ids.is_empty() {
            return Ok(Catalog::new());
        }

        self.fetch_feed(&[
            ("id_list", ids.join(",")),
            ("max_results", ids.len().to_string()),
        ])
        .await
    }

    /// Download URL of a paper's PDF
    #[must_use]
    pub fn pdf_url(&self, id: &ArtifactId) -> String {
        format!("{}/{}", self.pdf_host, id.file_name("pdf"))
    }

    async fn fetch_feed(
        &self,
        params: &[(&str, String)],
    ) -> std::result::Result<Catalog, QueryError> {
        let response = self
            .http
            .get(&self.endpoint)
            .query(params)
            .send()
            .await
            .map_err(|e| QueryError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let url = response.url().to_string();
            tracing::error!("Error {status} querying catalog at {url}");
            return Err(QueryError::HttpStatus {
                url,
                status: status.as_u16(),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| QueryError::Network(e.to_string()))?;

        let catalog = parse_feed(&body)?;
        tracing::info!("Query completed with {} entries", catalog.len());
        Ok(catalog)
    }
}
