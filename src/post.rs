// src/post.rs
//! Post detail assembly: the full post view-model, its adjacent posts and
//! the estimated reading time.

use crate::api::query::{DocumentQuery, Ordering, Predicate};
use crate::api::ContentRepository;
use crate::constants::{ADJACENT_POST_PAGE_SIZE, PUBLICATION_DATE_FIELD, WORDS_PER_MINUTE};
use crate::error::{AppError, Result};
use crate::formatting::plain_text::{count_words, strip_markup};
use crate::mapping::{map_adjacent, map_detail};
use crate::model::{AdjacentPostRef, ContentSection, PostDetail};
use crate::types::{DocumentType, PostUid, PreviewRef, PublicationDate};

// ---------------------------------------------------------------------------
// Reading time
// ---------------------------------------------------------------------------

/// Words in a post: every body fragment (markup stripped) plus every
/// non-empty heading.
pub fn count_content_words(sections: &[ContentSection]) -> usize {
    let body_text = sections
        .iter()
        .flat_map(|section| section.body_html.iter())
        .map(|fragment| strip_markup(fragment))
        .collect::<Vec<_>>()
        .join(" ");

    let heading_text = sections
        .iter()
        .map(|section| section.heading.as_str())
        .filter(|heading| !heading.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    count_words(&body_text) + count_words(&heading_text)
}

/// Minutes needed to read a post at 200 words per minute, rounded up.
pub fn estimate_reading_time(sections: &[ContentSection]) -> usize {
    count_content_words(sections).div_ceil(WORDS_PER_MINUTE)
}

// ---------------------------------------------------------------------------
// Adjacent posts
// ---------------------------------------------------------------------------

/// The posts published right after and right before a given date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdjacentPosts {
    pub previous: Option<AdjacentPostRef>,
    pub next: Option<AdjacentPostRef>,
}

fn adjacent_query(predicate: Predicate, ordering: Ordering) -> DocumentQuery {
    DocumentQuery::posts()
        .and(predicate)
        .fetch("posts.title")
        .order_by(ordering)
        .page_size(ADJACENT_POST_PAGE_SIZE)
        .page(1)
}

/// Looks up the nearest post strictly after `date` (previous) and strictly
/// before it (next). Both lookups run concurrently.
pub async fn resolve_adjacent_posts(
    repository: &dyn ContentRepository,
    date: &PublicationDate,
) -> Result<AdjacentPosts> {
    let after = adjacent_query(
        Predicate::date_after(PUBLICATION_DATE_FIELD, date),
        Ordering::oldest_first(),
    );
    let before = adjacent_query(
        Predicate::date_before(PUBLICATION_DATE_FIELD, date),
        Ordering::newest_first(),
    );

    let (after_response, before_response) =
        futures::try_join!(repository.query(&after), repository.query(&before))?;

    Ok(AdjacentPosts {
        previous: after_response.results.first().map(map_adjacent),
        next: before_response.results.first().map(map_adjacent),
    })
}

// ---------------------------------------------------------------------------
// Assembly
// ---------------------------------------------------------------------------

/// A post ready to render.
#[derive(Debug, Clone, PartialEq)]
pub struct PostPage {
    pub detail: PostDetail,
    pub reading_time_minutes: usize,
    /// Rendered from a preview ref: adjacent posts are skipped and the
    /// leave-preview link is shown.
    pub preview: bool,
}

/// Fetches and assembles one post. `Ok(None)` means there is no such post.
pub async fn assemble_post(
    repository: &dyn ContentRepository,
    uid: &PostUid,
    preview_ref: Option<&PreviewRef>,
) -> Result<Option<PostPage>> {
    let document = match repository
        .get_by_uid(&DocumentType::posts(), uid, preview_ref)
        .await?
    {
        Some(document) => document,
        None => {
            log::info!("Post {} not found", uid);
            return Ok(None);
        }
    };

    let mut detail = map_detail(&document);
    let preview = preview_ref.is_some();

    if preview {
        log::debug!("Preview of {}: adjacent posts skipped", uid);
    } else if let Some(date) = detail.first_publication_date {
        let adjacent = resolve_adjacent_posts(repository, &date).await?;
        detail.previous_post = adjacent.previous;
        detail.next_post = adjacent.next;
    } else {
        log::warn!("Post {} has no publication date; adjacent posts skipped", uid);
    }

    let reading_time_minutes = estimate_reading_time(&detail.content_sections);
    log::debug!("Assembled post {} ({} min)", uid, reading_time_minutes);

    Ok(Some(PostPage {
        detail,
        reading_time_minutes,
        preview,
    }))
}

// ---------------------------------------------------------------------------
// Page state
// ---------------------------------------------------------------------------

/// What a post route shows: a placeholder until the post has been fetched,
/// then the post itself.
#[derive(Debug, Clone, PartialEq)]
pub enum PostPageState {
    LoadingFallback,
    Ready(Box<PostPage>),
}

impl PostPageState {
    /// Applies the result of the detail fetch.
    ///
    /// Only `LoadingFallback` can complete. A fetch that found nothing
    /// yields [`AppError::PostNotFound`], which callers answer with a
    /// redirect home.
    pub fn complete(self, fetched: Option<PostPage>, uid: &PostUid) -> Result<Self> {
        match self {
            Self::LoadingFallback => fetched
                .map(|page| Self::Ready(Box::new(page)))
                .ok_or_else(|| AppError::PostNotFound {
                    uid: uid.to_string(),
                }),
            Self::Ready(_) => Err(AppError::InvalidTransition { state: self.name() }),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::LoadingFallback => "LoadingFallback",
            Self::Ready(_) => "Ready",
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::LoadingFallback)
    }

    pub fn page(&self) -> Option<&PostPage> {
        match self {
            Self::Ready(page) => Some(&**page),
            Self::LoadingFallback => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::responses::RawDocument;
    use crate::api::InMemoryRepository;
    use serde_json::json;

    fn section(heading: &str, body: &[&str]) -> ContentSection {
        ContentSection {
            heading: heading.to_string(),
            body_html: body.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn words(n: usize) -> String {
        vec!["palavra"; n].join(" ")
    }

    fn post(uid: &str, date: &str) -> RawDocument {
        RawDocument {
            uid: uid.to_string(),
            document_type: "posts".to_string(),
            first_publication_date: Some(date.to_string()),
            data: json!({
                "title": format!("Post {}", uid),
                "content": [ { "heading": "Intro", "body": [ { "type": "paragraph", "text": words(5) } ] } ]
            }),
            ..Default::default()
        }
    }

    fn quarterly_blog() -> InMemoryRepository {
        InMemoryRepository::new(vec![
            post("january", "2021-01-15T10:00:00+0000"),
            post("april", "2021-04-15T10:00:00+0000"),
            post("february", "2021-02-15T10:00:00+0000"),
            post("march", "2021-03-15T10:00:00+0000"),
        ])
    }

    #[test]
    fn test_seven_words_take_one_minute() {
        let sections = [section("Heading", &["one <em>two</em> three four five six"])];
        assert_eq!(count_content_words(&sections), 7);
        assert_eq!(estimate_reading_time(&sections), 1);
    }

    #[test]
    fn test_headings_and_bodies_are_counted_together() {
        let sections = [
            section("Intro", &["hello world"]),
            section("Body", &["foo bar baz"]),
        ];
        assert_eq!(count_content_words(&sections), 7);
        assert_eq!(estimate_reading_time(&sections), 1);
    }

    #[test]
    fn test_empty_headings_add_no_words() {
        let sections = [
            section("Intro", &["hello world"]),
            section("", &["foo bar baz"]),
            section("Outro", &[]),
        ];
        assert_eq!(count_content_words(&sections), 7);
    }

    #[test]
    fn test_two_hundred_fifty_words_take_two_minutes() {
        let sections = [section("", &[words(150).as_str(), words(100).as_str()])];
        assert_eq!(count_content_words(&sections), 250);
        assert_eq!(estimate_reading_time(&sections), 2);
    }

    #[test]
    fn test_empty_content_takes_no_time() {
        assert_eq!(estimate_reading_time(&[]), 0);
        assert_eq!(estimate_reading_time(&[section("", &[])]), 0);
    }

    #[test]
    fn test_exactly_two_hundred_words_is_one_minute() {
        let sections = [section("", &[words(200).as_str()])];
        assert_eq!(estimate_reading_time(&sections), 1);
    }

    #[tokio::test]
    async fn test_adjacent_posts_are_nearest_neighbours() {
        let repo = quarterly_blog();
        let page = assemble_post(&repo, &PostUid::parse("february").unwrap(), None)
            .await
            .unwrap()
            .unwrap();

        let previous = page.detail.previous_post.unwrap();
        let next = page.detail.next_post.unwrap();
        assert_eq!(previous.uid.as_str(), "march");
        assert_eq!(previous.title, "Post march");
        assert_eq!(next.uid.as_str(), "january");
        assert_eq!(page.reading_time_minutes, 1);
        assert!(!page.preview);
    }

    #[tokio::test]
    async fn test_oldest_and_newest_posts_have_one_neighbour() {
        let repo = quarterly_blog();

        let oldest = assemble_post(&repo, &PostUid::parse("january").unwrap(), None)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(oldest.detail.previous_post.map(|p| p.uid.to_string()), Some("february".to_string()));
        assert!(oldest.detail.next_post.is_none());

        let newest = assemble_post(&repo, &PostUid::parse("april").unwrap(), None)
            .await
            .unwrap()
            .unwrap();
        assert!(newest.detail.previous_post.is_none());
        assert_eq!(newest.detail.next_post.map(|p| p.uid.to_string()), Some("march".to_string()));
    }

    #[tokio::test]
    async fn test_preview_skips_adjacent_posts() {
        let repo = quarterly_blog();
        let preview_ref = PreviewRef::new("YFPreview").unwrap();
        let page = assemble_post(&repo, &PostUid::parse("february").unwrap(), Some(&preview_ref))
            .await
            .unwrap()
            .unwrap();

        assert!(page.preview);
        assert!(page.detail.previous_post.is_none());
        assert!(page.detail.next_post.is_none());
        assert_eq!(repo.request_count(), 1);
    }

    #[tokio::test]
    async fn test_missing_post_is_none() {
        let repo = quarterly_blog();
        let page = assemble_post(&repo, &PostUid::parse("december").unwrap(), None)
            .await
            .unwrap();
        assert!(page.is_none());
    }

    #[test]
    fn test_page_state_transitions() {
        let uid = PostUid::parse("february").unwrap();
        let page = PostPage {
            detail: PostDetail::default(),
            reading_time_minutes: 3,
            preview: false,
        };

        let ready = PostPageState::LoadingFallback
            .complete(Some(page.clone()), &uid)
            .unwrap();
        assert!(!ready.is_fallback());
        assert_eq!(ready.page().map(|p| p.reading_time_minutes), Some(3));

        assert!(matches!(
            ready.complete(Some(page), &uid),
            Err(AppError::InvalidTransition { state: "Ready" })
        ));
        assert!(matches!(
            PostPageState::LoadingFallback.complete(None, &uid),
            Err(AppError::PostNotFound { .. })
        ));
    }
}
