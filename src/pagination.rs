// src/pagination.rs
//! Pagination accumulator: the post listing grows one fetched page at a time.
//!
//! [`merge`] is the pure reducer. [`PostFeed`] wraps it with the "load more"
//! behavior: one load at a time, retries on transient failures, and a state
//! that is left untouched when a load finally fails.

use crate::api::query::{DocumentQuery, Ordering};
use crate::api::responses::{RawDocument, SearchResponse};
use crate::api::ContentRepository;
use crate::error::{AppError, Result};
use crate::error_recovery::{retry_with_backoff, RetryPolicy};
use crate::mapping::map_summary;
use crate::model::PaginationState;
use crate::types::PreviewRef;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

/// Appends a fetched page to the listing and takes over its cursor.
///
/// Existing items keep their position, incoming documents are mapped in
/// the order they arrived, and nothing is deduplicated. The cursor is
/// replaced even when the new one is absent or empty.
pub fn merge(
    existing: PaginationState,
    incoming: &[RawDocument],
    incoming_cursor: Option<String>,
) -> PaginationState {
    let mut items = existing.items;
    items.extend(incoming.iter().map(map_summary));
    PaginationState::new(items, incoming_cursor)
}

/// The listing after the first page of results.
pub fn initial_state(response: &SearchResponse) -> PaginationState {
    merge(
        PaginationState::default(),
        &response.results,
        response.next_page.clone(),
    )
}

/// The home listing query: newest posts first, summary fields only.
pub fn listing_query(page_size: u32, preview_ref: Option<PreviewRef>) -> DocumentQuery {
    DocumentQuery::posts()
        .fetch("posts.title")
        .fetch("posts.subtitle")
        .fetch("posts.author")
        .order_by(Ordering::newest_first())
        .page_size(page_size)
        .page(1)
        .with_ref(preview_ref)
}

/// What a "load more" request did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and appended.
    Loaded { added: usize },
    /// There was no further page to fetch.
    Exhausted,
}

/// Marks a load as running for as long as it lives.
struct InFlightGuard<'a>(&'a AtomicBool);

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, AtomicOrdering::AcqRel, AtomicOrdering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, AtomicOrdering::Release);
    }
}

/// An accumulating post listing with serialized "load more".
pub struct PostFeed {
    state: Mutex<PaginationState>,
    in_flight: AtomicBool,
    retry: RetryPolicy,
}

impl PostFeed {
    pub fn new(initial: PaginationState) -> Self {
        Self {
            state: Mutex::new(initial),
            in_flight: AtomicBool::new(false),
            retry: RetryPolicy::load_more(),
        }
    }

    /// Fetches the first listing page and starts a feed from it.
    pub async fn load_first_page(
        repository: &dyn ContentRepository,
        query: &DocumentQuery,
    ) -> Result<Self> {
        let response = repository.query(query).await?;
        log::info!(
            "Loaded {} of {} posts",
            response.results.len(),
            response.total_results_size
        );
        Ok(Self::new(initial_state(&response)))
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// A copy of the current listing.
    pub fn snapshot(&self) -> PaginationState {
        self.state.lock().clone()
    }

    pub fn can_load_more(&self) -> bool {
        self.state.lock().has_more_pages()
    }

    pub fn is_loading(&self) -> bool {
        self.in_flight.load(AtomicOrdering::Acquire)
    }

    pub fn into_state(self) -> PaginationState {
        self.state.into_inner()
    }

    fn next_cursor(&self) -> Option<String> {
        self.state.lock().cursor().map(str::to_string)
    }

    /// Fetches the page behind the current cursor and appends it.
    ///
    /// Fails with [`AppError::LoadInFlight`] while another load runs. A fetch
    /// that still fails after retrying yields [`AppError::LoadMoreFailed`]
    /// and leaves the listing as it was.
    pub async fn load_more(&self, repository: &dyn ContentRepository) -> Result<LoadOutcome> {
        let _guard = InFlightGuard::acquire(&self.in_flight).ok_or(AppError::LoadInFlight)?;

        let cursor = match self.next_cursor() {
            Some(cursor) => cursor,
            None => return Ok(LoadOutcome::Exhausted),
        };

        log::debug!("Loading more posts from {}", cursor);
        let response = retry_with_backoff(|| repository.follow_cursor(&cursor), self.retry)
            .await
            .map_err(|e| {
                log::warn!("Loading more posts failed: {}", e);
                AppError::LoadMoreFailed {
                    cursor: cursor.clone(),
                    source: Box::new(e),
                }
            })?;

        let added = response.results.len();
        let mut state = self.state.lock();
        let current = std::mem::take(&mut *state);
        *state = merge(current, &response.results, response.next_page);
        Ok(LoadOutcome::Loaded { added })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::InMemoryRepository;
    use crate::model::PostSummary;
    use serde_json::json;
    use std::time::Duration;

    fn post(uid: &str, date: &str) -> RawDocument {
        RawDocument {
            uid: uid.to_string(),
            document_type: "posts".to_string(),
            first_publication_date: Some(date.to_string()),
            data: json!({ "title": uid.to_uppercase(), "author": "Danilo" }),
            ..Default::default()
        }
    }

    fn uids(items: &[PostSummary]) -> Vec<&str> {
        items.iter().map(|p| p.uid.as_str()).collect()
    }

    fn seven_posts() -> InMemoryRepository {
        InMemoryRepository::new(
            (1..=7)
                .map(|day| post(&format!("post-{}", day), &format!("2021-03-0{}T10:00:00+0000", day)))
                .collect(),
        )
    }

    fn fast_retry(max_attempts: u32) -> RetryPolicy {
        RetryPolicy {
            max_attempts,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
        }
    }

    #[test]
    fn test_merge_empty_page_keeps_items_and_replaces_cursor() {
        let existing = merge(PaginationState::default(), &[post("a", "2021-01-01")], Some("c1".into()));
        let merged = merge(existing.clone(), &[], Some("c2".into()));

        assert_eq!(merged.items, existing.items);
        assert_eq!(merged.next_page_cursor.as_deref(), Some("c2"));

        let last = merge(merged, &[], None);
        assert!(last.next_page_cursor.is_none());
    }

    #[test]
    fn test_merge_appends_in_order() {
        let first = merge(
            PaginationState::default(),
            &[post("c", "2021-03-01"), post("b", "2021-02-01")],
            Some("next".into()),
        );
        let second = merge(first, &[post("a", "2021-01-01")], None);
        assert_eq!(uids(&second.items), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_repeated_merge_equals_merge_of_concatenation() {
        let s = merge(PaginationState::default(), &[post("x", "2021-04-01")], Some("c0".into()));
        let a = vec![post("a", "2021-03-01"), post("b", "2021-02-01")];
        let b = vec![post("c", "2021-01-01")];

        let stepwise = merge(merge(s.clone(), &a, Some("c1".into())), &b, Some("c2".into()));
        let combined: Vec<RawDocument> = a.iter().chain(b.iter()).cloned().collect();
        let at_once = merge(s, &combined, Some("c2".into()));

        assert_eq!(stepwise, at_once);
    }

    #[test]
    fn test_duplicates_are_preserved() {
        let page = [post("same", "2021-01-01")];
        let once = merge(PaginationState::default(), &page, Some("c".into()));
        let twice = merge(once, &page, None);
        assert_eq!(uids(&twice.items), vec!["same", "same"]);
    }

    #[test]
    fn test_listing_query_shape() {
        let query = listing_query(3, None);
        assert_eq!(query.page_size, 3);
        assert_eq!(query.page, 1);
        assert_eq!(
            query.orderings_string().as_deref(),
            Some("[document.first_publication_date desc]")
        );
    }

    #[tokio::test]
    async fn test_load_more_until_exhausted() {
        let repo = seven_posts();
        let feed = PostFeed::load_first_page(&repo, &listing_query(3, None))
            .await
            .unwrap();
        assert_eq!(uids(&feed.snapshot().items), vec!["post-7", "post-6", "post-5"]);

        assert_eq!(feed.load_more(&repo).await.unwrap(), LoadOutcome::Loaded { added: 3 });
        assert_eq!(feed.load_more(&repo).await.unwrap(), LoadOutcome::Loaded { added: 1 });
        assert!(!feed.can_load_more());
        assert_eq!(feed.load_more(&repo).await.unwrap(), LoadOutcome::Exhausted);

        let state = feed.into_state();
        assert_eq!(state.items.len(), 7);
        assert_eq!(state.items[6].uid.as_str(), "post-1");
    }

    #[tokio::test]
    async fn test_empty_cursor_stops_loading() {
        let repo = seven_posts();
        let feed = PostFeed::new(PaginationState::new(Vec::new(), Some(String::new())));

        assert!(!feed.can_load_more());
        assert_eq!(feed.load_more(&repo).await.unwrap(), LoadOutcome::Exhausted);
        assert_eq!(repo.request_count(), 0);
    }

    #[tokio::test]
    async fn test_second_load_is_refused_while_one_runs() {
        let repo = seven_posts();
        let feed = PostFeed::load_first_page(&repo, &listing_query(3, None))
            .await
            .unwrap();

        let held = InFlightGuard::acquire(&feed.in_flight).unwrap();
        assert!(feed.is_loading());
        assert!(matches!(feed.load_more(&repo).await, Err(AppError::LoadInFlight)));
        drop(held);

        assert!(!feed.is_loading());
        assert!(feed.load_more(&repo).await.is_ok());
    }

    #[tokio::test]
    async fn test_failed_load_leaves_state_and_can_be_retried() {
        let repo = seven_posts();
        let feed = PostFeed::load_first_page(&repo, &listing_query(3, None))
            .await
            .unwrap()
            .with_retry_policy(fast_retry(2));
        let before = feed.snapshot();

        repo.fail_next(2);
        let err = feed.load_more(&repo).await.unwrap_err();
        assert!(matches!(err, AppError::LoadMoreFailed { .. }));
        assert!(err.is_recoverable());
        assert_eq!(feed.snapshot(), before);
        assert!(!feed.is_loading());

        assert_eq!(feed.load_more(&repo).await.unwrap(), LoadOutcome::Loaded { added: 3 });
    }

    #[tokio::test]
    async fn test_transient_failure_is_retried_transparently() {
        let repo = seven_posts();
        let feed = PostFeed::load_first_page(&repo, &listing_query(3, None))
            .await
            .unwrap()
            .with_retry_policy(fast_retry(3));

        repo.fail_next(1);
        assert_eq!(feed.load_more(&repo).await.unwrap(), LoadOutcome::Loaded { added: 3 });
    }
}
