// src/api/mod.rs
//! Content API interaction: the ability to retrieve documents from a
//! Prismic repository.
//!
//! Business logic depends on [`ContentRepository`], never on HTTP details.
//! The HTTP client, the fixture-backed in-memory repository and the disk
//! cache all implement it.

pub mod cache;
pub mod client;
pub mod memory;
pub mod parser;
pub mod query;
pub mod responses;

use crate::error::AppError;
use crate::types::{DocumentType, PostUid, PreviewRef};
use query::{DocumentQuery, Predicate};
use responses::{RawDocument, SearchResponse};

/// The ability to retrieve content from a Prismic repository.
///
/// This is the fetch boundary of the blog: the query language itself is
/// opaque to everything above this trait.
#[async_trait::async_trait]
pub trait ContentRepository: Send + Sync {
    /// Runs a search and returns one page of raw documents.
    async fn query(&self, query: &DocumentQuery) -> Result<SearchResponse, AppError>;

    /// Fetches the page a previous response's `next_page` cursor points at.
    async fn follow_cursor(&self, cursor: &str) -> Result<SearchResponse, AppError>;

    /// Fetches a single document by its type and UID.
    ///
    /// Returns `Ok(None)` when no such document exists.
    async fn get_by_uid(
        &self,
        document_type: &DocumentType,
        uid: &PostUid,
        preview_ref: Option<&PreviewRef>,
    ) -> Result<Option<RawDocument>, AppError> {
        let query = DocumentQuery::new(Predicate::at(
            format!("my.{}.uid", document_type.as_str()),
            uid.as_str(),
        ))
        .page_size(1)
        .with_ref(preview_ref.cloned());

        let response = self.query(&query).await?;
        Ok(response.results.into_iter().next())
    }
}

// Re-export the public interface
pub use cache::CachedContentClient;
pub use client::PrismicHttpClient;
pub use memory::InMemoryRepository;
