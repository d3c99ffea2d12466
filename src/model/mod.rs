//! Post view-models: what the document mapper produces and the renderer
//! consumes.
//!
//! Every type here is built once from a raw document and never mutated
//! afterwards.

use crate::types::{PostUid, PublicationDate};
use serde::{Deserialize, Serialize};

/// One entry of the post listing.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: PostUid,
    pub first_publication_date: Option<PublicationDate>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// A titled group of body fragments.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ContentSection {
    pub heading: String,
    /// Body fragments as HTML, in document order.
    pub body_html: Vec<String>,
}

/// Link target for the post published just before or after another one.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AdjacentPostRef {
    pub uid: PostUid,
    pub title: String,
}

/// Everything a post page shows.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PostDetail {
    pub uid: PostUid,
    pub first_publication_date: Option<PublicationDate>,
    pub last_publication_date: Option<PublicationDate>,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner_url: String,
    pub content_sections: Vec<ContentSection>,
    /// The nearest post published after this one.
    pub previous_post: Option<AdjacentPostRef>,
    /// The nearest post published before this one.
    pub next_post: Option<AdjacentPostRef>,
}

impl PostDetail {
    /// The listing entry for this post.
    pub fn summary(&self) -> PostSummary {
        PostSummary {
            uid: self.uid.clone(),
            first_publication_date: self.first_publication_date,
            title: self.title.clone(),
            subtitle: self.subtitle.clone(),
            author: self.author.clone(),
        }
    }
}

/// The accumulated post listing plus the cursor of the next page.
///
/// `items` keeps the order the content API returned (newest first); merges
/// only ever append.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PaginationState {
    pub items: Vec<PostSummary>,
    pub next_page_cursor: Option<String>,
}

impl PaginationState {
    pub fn new(items: Vec<PostSummary>, next_page_cursor: Option<String>) -> Self {
        Self {
            items,
            next_page_cursor,
        }
    }

    /// The cursor to follow, if another page exists. An empty cursor counts
    /// as none.
    pub fn cursor(&self) -> Option<&str> {
        self.next_page_cursor
            .as_deref()
            .filter(|cursor| !cursor.is_empty())
    }

    /// Whether "load more" should be offered.
    pub fn has_more_pages(&self) -> bool {
        self.cursor().is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_cursor_means_no_more_pages() {
        let mut state = PaginationState::default();
        assert!(!state.has_more_pages());

        state.next_page_cursor = Some(String::new());
        assert!(!state.has_more_pages());

        state.next_page_cursor = Some("https://x.cdn.prismic.io/api/v2/documents/search?page=2".into());
        assert!(state.has_more_pages());
    }

    #[test]
    fn test_summary_of_detail() {
        let detail = PostDetail {
            uid: PostUid::from_document("como-utilizar-hooks"),
            title: "Como utilizar Hooks".to_string(),
            author: "Joseph Oliveira".to_string(),
            banner_url: "https://images.prismic.io/banner.png".to_string(),
            ..Default::default()
        };

        let summary = detail.summary();
        assert_eq!(summary.uid.as_str(), "como-utilizar-hooks");
        assert_eq!(summary.author, "Joseph Oliveira");
    }
}
