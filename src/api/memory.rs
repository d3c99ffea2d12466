// src/api/memory.rs
//! Fixture-backed content repository.
//!
//! Answers the same queries as the HTTP client from a fixed set of
//! documents. Used for offline builds (`--fixture`) and throughout the tests.

use super::query::{DocumentQuery, Ordering, Predicate, SortDirection};
use super::responses::{RawDocument, SearchResponse};
use super::ContentRepository;
use crate::constants::PUBLICATION_DATE_FIELD;
use crate::error::{AppError, PrismicErrorCode};
use crate::types::PublicationDate;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};

const CURSOR_SCHEME: &str = "memory:";

/// In-memory [`ContentRepository`] over a list of documents.
pub struct InMemoryRepository {
    documents: Vec<RawDocument>,
    cursors: Mutex<HashMap<String, DocumentQuery>>,
    requests: AtomicUsize,
    pending_failures: AtomicUsize,
}

impl InMemoryRepository {
    pub fn new(documents: Vec<RawDocument>) -> Self {
        Self {
            documents,
            cursors: Mutex::new(HashMap::new()),
            requests: AtomicUsize::new(0),
            pending_failures: AtomicUsize::new(0),
        }
    }

    /// Loads documents from a JSON file holding either a search response
    /// (`{ "results": [...] }`) or a bare array of documents.
    pub fn from_fixture(path: &Path) -> Result<Self, AppError> {
        let content = std::fs::read_to_string(path)?;
        let json_error = |source| AppError::JsonParseError {
            path: path.to_path_buf(),
            source,
        };

        let value: serde_json::Value = serde_json::from_str(&content).map_err(json_error)?;
        let documents: Vec<RawDocument> = if value.is_array() {
            serde_json::from_value(value).map_err(json_error)?
        } else {
            serde_json::from_value::<SearchResponse>(value)
                .map_err(json_error)?
                .results
        };

        log::info!(
            "Loaded {} documents from fixture {}",
            documents.len(),
            path.display()
        );
        Ok(Self::new(documents))
    }

    /// Number of queries and cursor fetches answered so far, failures included.
    pub fn request_count(&self) -> usize {
        self.requests.load(AtomicOrdering::SeqCst)
    }

    /// Makes the next `count` requests fail with a transient service error.
    pub fn fail_next(&self, count: usize) {
        self.pending_failures.store(count, AtomicOrdering::SeqCst);
    }

    /// Counts a request and yields once, as a network round-trip would.
    async fn begin_request(&self) -> Result<(), AppError> {
        tokio::task::yield_now().await;
        self.requests.fetch_add(1, AtomicOrdering::SeqCst);
        let injected = self
            .pending_failures
            .fetch_update(AtomicOrdering::SeqCst, AtomicOrdering::SeqCst, |n| {
                n.checked_sub(1)
            })
            .is_ok();
        if injected {
            return Err(AppError::PrismicService {
                code: PrismicErrorCode::ServiceUnavailable,
                message: "Simulated outage".to_string(),
                status: reqwest::StatusCode::SERVICE_UNAVAILABLE,
            });
        }
        Ok(())
    }

    fn search(&self, query: &DocumentQuery) -> SearchResponse {
        let mut matching: Vec<&RawDocument> = self
            .documents
            .iter()
            .filter(|doc| query.predicates.iter().all(|p| matches_predicate(doc, p)))
            .collect();

        if let Some(direction) = date_ordering(&query.orderings) {
            matching.sort_by_key(|doc| publication_millis(doc));
            if direction == SortDirection::Descending {
                matching.reverse();
            }
        }

        let page_size = query.page_size.max(1) as usize;
        let total = matching.len();
        let total_pages = total.div_ceil(page_size) as u32;
        let results: Vec<RawDocument> = matching
            .into_iter()
            .skip((query.page.max(1) as usize - 1) * page_size)
            .take(page_size)
            .cloned()
            .collect();

        let next_page = if query.page < total_pages {
            let next_query = query.clone().page(query.page + 1);
            let cursor = format!("{}{}", CURSOR_SCHEME, next_query.cache_key());
            self.cursors.lock().insert(cursor.clone(), next_query);
            Some(cursor)
        } else {
            None
        };

        SearchResponse {
            page: query.page,
            results_per_page: page_size as u32,
            results_size: results.len() as u32,
            total_results_size: total as u32,
            total_pages,
            next_page,
            prev_page: None,
            results,
        }
    }
}

#[async_trait::async_trait]
impl ContentRepository for InMemoryRepository {
    async fn query(&self, query: &DocumentQuery) -> Result<SearchResponse, AppError> {
        self.begin_request().await?;
        Ok(self.search(query))
    }

    async fn follow_cursor(&self, cursor: &str) -> Result<SearchResponse, AppError> {
        self.begin_request().await?;
        let query = self
            .cursors
            .lock()
            .get(cursor)
            .cloned()
            .ok_or_else(|| AppError::MalformedResponse(format!("Unknown cursor: {}", cursor)))?;
        Ok(self.search(&query))
    }
}

fn publication_millis(doc: &RawDocument) -> Option<i64> {
    doc.first_publication_date
        .as_deref()
        .and_then(|raw| PublicationDate::parse(raw).ok())
        .map(|date| date.timestamp_millis())
}

fn date_ordering(orderings: &[Ordering]) -> Option<SortDirection> {
    orderings
        .iter()
        .find(|o| o.field == PUBLICATION_DATE_FIELD)
        .map(|o| o.direction)
}

fn matches_predicate(doc: &RawDocument, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::At { path, value } => match path.as_str() {
            "document.type" => doc.document_type == *value,
            "document.id" => doc.id == *value,
            _ => match path
                .strip_prefix("my.")
                .and_then(|rest| rest.strip_suffix(".uid"))
            {
                Some(document_type) => doc.document_type == document_type && doc.uid == *value,
                None => {
                    log::debug!("Unsupported predicate path {}", path);
                    false
                }
            },
        },
        Predicate::DateAfter { path, millis } => {
            path == PUBLICATION_DATE_FIELD
                && publication_millis(doc).is_some_and(|date| date > *millis)
        }
        Predicate::DateBefore { path, millis } => {
            path == PUBLICATION_DATE_FIELD
                && publication_millis(doc).is_some_and(|date| date < *millis)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{DocumentType, PostUid};

    fn post(uid: &str, date: &str) -> RawDocument {
        RawDocument {
            id: format!("id-{}", uid),
            uid: uid.to_string(),
            document_type: "posts".to_string(),
            first_publication_date: Some(date.to_string()),
            ..Default::default()
        }
    }

    fn repository() -> InMemoryRepository {
        InMemoryRepository::new(vec![
            post("january", "2021-01-10T12:00:00+0000"),
            post("march", "2021-03-10T12:00:00+0000"),
            post("february", "2021-02-10T12:00:00+0000"),
        ])
    }

    fn uids(response: &SearchResponse) -> Vec<&str> {
        response.results.iter().map(|d| d.uid.as_str()).collect()
    }

    #[tokio::test]
    async fn test_newest_first_paging_with_cursor() {
        let repo = repository();
        let query = DocumentQuery::posts()
            .order_by(Ordering::newest_first())
            .page_size(2);

        let first = repo.query(&query).await.unwrap();
        assert_eq!(uids(&first), vec!["march", "february"]);
        assert_eq!(first.total_pages, 2);

        let cursor = first.next_page.clone().unwrap();
        let second = repo.follow_cursor(&cursor).await.unwrap();
        assert_eq!(uids(&second), vec!["january"]);
        assert!(second.next_page.is_none());
    }

    #[tokio::test]
    async fn test_date_predicates_are_strict() {
        let repo = repository();
        let pivot = PublicationDate::parse("2021-02-10T12:00:00+0000").unwrap();
        let after = DocumentQuery::posts()
            .and(Predicate::date_after(PUBLICATION_DATE_FIELD, &pivot))
            .order_by(Ordering::oldest_first());

        let response = repo.query(&after).await.unwrap();
        assert_eq!(uids(&response), vec!["march"]);
    }

    #[tokio::test]
    async fn test_get_by_uid() {
        let repo = repository();
        let uid = PostUid::parse("february").unwrap();
        let found = repo
            .get_by_uid(&DocumentType::posts(), &uid, None)
            .await
            .unwrap();
        assert_eq!(found.map(|d| d.id), Some("id-february".to_string()));

        let missing = PostUid::parse("april").unwrap();
        let none = repo
            .get_by_uid(&DocumentType::posts(), &missing, None)
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_injected_failures_are_transient() {
        let repo = repository();
        repo.fail_next(1);
        let query = DocumentQuery::posts();

        let err = repo.query(&query).await.unwrap_err();
        assert!(err.is_retryable());
        assert!(repo.query(&query).await.is_ok());
        assert_eq!(repo.request_count(), 2);
    }

    #[test]
    fn test_fixture_accepts_search_response_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("posts.json");
        std::fs::write(
            &path,
            r#"{ "next_page": null, "results": [ { "uid": "only", "type": "posts" } ] }"#,
        )
        .unwrap();

        let repo = InMemoryRepository::from_fixture(&path).unwrap();
        assert_eq!(repo.documents.len(), 1);
    }
}
