// tests/load_more.rs
//! "Load more" against the fixture repository, driven the way a reader
//! clicking the button would.

use pretty_assertions::assert_eq;
use spacetraveling::error_recovery::RetryPolicy;
use spacetraveling::pagination::listing_query;
use spacetraveling::{AppError, InMemoryRepository, LoadOutcome, PostFeed};
use std::path::Path;

fn repository() -> InMemoryRepository {
    let fixture = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/posts.json");
    InMemoryRepository::from_fixture(&fixture).unwrap()
}

fn uids(feed: &PostFeed) -> Vec<String> {
    feed.snapshot()
        .items
        .iter()
        .map(|post| post.uid.to_string())
        .collect()
}

#[tokio::test]
async fn test_clicking_load_more_until_the_end() {
    let repo = repository();
    let feed = PostFeed::load_first_page(&repo, &listing_query(2, None))
        .await
        .unwrap();
    assert_eq!(uids(&feed), vec!["next-js-e-ssg", "typescript-na-pratica"]);
    assert!(feed.can_load_more());

    assert_eq!(
        feed.load_more(&repo).await.unwrap(),
        LoadOutcome::Loaded { added: 2 }
    );
    assert_eq!(
        feed.load_more(&repo).await.unwrap(),
        LoadOutcome::Loaded { added: 1 }
    );
    assert!(!feed.can_load_more());
    assert_eq!(feed.load_more(&repo).await.unwrap(), LoadOutcome::Exhausted);

    assert_eq!(
        uids(&feed),
        vec![
            "next-js-e-ssg",
            "typescript-na-pratica",
            "mapas-com-react-usando-leaflet",
            "criando-um-app-cra-do-zero",
            "como-utilizar-hooks",
        ]
    );
    // first page plus two cursor fetches; the exhausted click sends nothing
    assert_eq!(repo.request_count(), 3);
}

#[tokio::test]
async fn test_failed_load_keeps_listing_and_cursor() {
    let repo = repository();
    let feed = PostFeed::load_first_page(&repo, &listing_query(2, None))
        .await
        .unwrap()
        .with_retry_policy(RetryPolicy::once());
    let before = feed.snapshot();

    repo.fail_next(1);
    let error = feed.load_more(&repo).await.unwrap_err();
    assert!(matches!(error, AppError::LoadMoreFailed { .. }));
    assert_eq!(feed.snapshot(), before);
    assert!(!feed.is_loading());

    assert_eq!(
        feed.load_more(&repo).await.unwrap(),
        LoadOutcome::Loaded { added: 2 }
    );
}

#[tokio::test]
async fn test_concurrent_clicks_fetch_one_page() {
    let repo = repository();
    let feed = PostFeed::load_first_page(&repo, &listing_query(1, None))
        .await
        .unwrap();

    let (first, second) = tokio::join!(feed.load_more(&repo), feed.load_more(&repo));
    let outcomes = [first, second];

    let loaded = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Ok(LoadOutcome::Loaded { added: 1 })))
        .count();
    let refused = outcomes
        .iter()
        .filter(|outcome| matches!(outcome, Err(AppError::LoadInFlight)))
        .count();

    assert_eq!((loaded, refused), (1, 1));
    assert_eq!(feed.snapshot().items.len(), 2);
}
