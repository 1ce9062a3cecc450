//! Turning user queries into downloadable streams
//!
//! [`NameResolver`] maps free text to a [`SourceReference`] with a single top-1 search.
//! [`SourceFetcher`] maps a reference or a raw link to the [`StreamDescriptor`] of the best
//! combined stream. Both delegate to a shared [`Catalog`].

use std::sync::Arc;

use crate::catalog::{Catalog, VideoRef};
use crate::error::{Error, Result};
use crate::types::{SourceReference, StreamDescriptor};

/// Free-text search, limited to the single best match
#[derive(Clone)]
pub struct NameResolver {
    catalog: Arc<dyn Catalog>,
}

impl NameResolver {
    /// Create a resolver over `catalog`
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Resolve `name` to the first search hit
    ///
    /// No re-ranking is applied: whatever the catalog returns first wins.
    ///
    /// # Errors
    ///
    /// `NotFound` when the search has no results, `TransferFailed` on network faults.
    pub async fn resolve(&self, name: &str) -> Result<SourceReference> {
        let name = name.trim();
        tracing::debug!(catalog = self.catalog.name(), query = %name, "Searching catalog");

        match self.catalog.search_top(name).await? {
            Some(hit) => {
                tracing::debug!(title = %hit.title, url = %hit.url, "Search hit");
                Ok(hit)
            }
            None => Err(Error::NotFound(format!("no results for {name:?}"))),
        }
    }
}

/// Stream resolution for a resolved reference or a raw link
#[derive(Clone)]
pub struct SourceFetcher {
    catalog: Arc<dyn Catalog>,
}

impl SourceFetcher {
    /// Create a fetcher over `catalog`
    pub fn new(catalog: Arc<dyn Catalog>) -> Self {
        Self { catalog }
    }

    /// Fetch the best stream for a reference produced by [`NameResolver`]
    pub async fn fetch_reference(&self, source: &SourceReference) -> Result<StreamDescriptor> {
        self.fetch_link(&source.url).await
    }

    /// Validate `link` and fetch its best combined audio/video stream
    ///
    /// # Errors
    ///
    /// `InvalidSource` for malformed links (no network request is made), `NotFound` when the
    /// video is unknown or has no combined stream, `TransferFailed` on network faults.
    pub async fn fetch_link(&self, link: &str) -> Result<StreamDescriptor> {
        let video = VideoRef::parse(link)?;
        tracing::debug!(catalog = self.catalog.name(), video = %video, "Fetching stream info");

        let stream = self.catalog.fetch(&video).await?;
        tracing::debug!(
            title = %stream.source.title,
            container = %stream.container,
            quality = ?stream.quality_label,
            "Selected stream"
        );
        Ok(stream)
    }
}
