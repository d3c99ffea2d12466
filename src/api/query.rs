// src/api/query.rs
//! Search queries against the Prismic documents endpoint.
//!
//! Queries are immutable values built with chained methods and rendered
//! into the `q`, `orderings`, `fetch`, `pageSize` and `page` URL parameters
//! the API expects.

use crate::constants::{MAX_PAGE_SIZE, PUBLICATION_DATE_FIELD};
use crate::types::{DocumentType, PreviewRef, PublicationDate};
use url::Url;

/// Page size Prismic applies when a query does not set one.
const DEFAULT_QUERY_PAGE_SIZE: u32 = 20;

/// A single filter on the searched documents.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `path` equals `value` exactly
    At { path: String, value: String },
    /// The date at `path` is strictly after `millis`
    DateAfter { path: String, millis: i64 },
    /// The date at `path` is strictly before `millis`
    DateBefore { path: String, millis: i64 },
}

impl Predicate {
    pub fn at(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self::At {
            path: path.into(),
            value: value.into(),
        }
    }

    pub fn document_type(document_type: &DocumentType) -> Self {
        Self::at("document.type", document_type.as_str())
    }

    pub fn date_after(path: impl Into<String>, date: &PublicationDate) -> Self {
        Self::DateAfter {
            path: path.into(),
            millis: date.timestamp_millis(),
        }
    }

    pub fn date_before(path: impl Into<String>, date: &PublicationDate) -> Self {
        Self::DateBefore {
            path: path.into(),
            millis: date.timestamp_millis(),
        }
    }

    /// Renders the predicate in Prismic's query syntax.
    pub fn to_query_string(&self) -> String {
        match self {
            Self::At { path, value } => {
                format!("[at({}, \"{}\")]", path, value.replace('"', "\\\""))
            }
            Self::DateAfter { path, millis } => format!("[date.after({}, {})]", path, millis),
            Self::DateBefore { path, millis } => format!("[date.before({}, {})]", path, millis),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// One sort key of a query.
#[derive(Debug, Clone, PartialEq)]
pub struct Ordering {
    pub field: String,
    pub direction: SortDirection,
}

impl Ordering {
    pub fn ascending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Ascending,
        }
    }

    pub fn descending(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: SortDirection::Descending,
        }
    }

    /// Newest posts first.
    pub fn newest_first() -> Self {
        Self::descending(PUBLICATION_DATE_FIELD)
    }

    /// Oldest posts first.
    pub fn oldest_first() -> Self {
        Self::ascending(PUBLICATION_DATE_FIELD)
    }

    fn to_query_fragment(&self) -> String {
        match self.direction {
            SortDirection::Ascending => self.field.clone(),
            SortDirection::Descending => format!("{} desc", self.field),
        }
    }
}

/// A complete search request: predicates plus paging and projection options.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentQuery {
    pub predicates: Vec<Predicate>,
    pub fetch: Vec<String>,
    pub orderings: Vec<Ordering>,
    pub page_size: u32,
    pub page: u32,
    pub preview_ref: Option<PreviewRef>,
}

impl DocumentQuery {
    pub fn new(first: Predicate) -> Self {
        Self {
            predicates: vec![first],
            fetch: Vec::new(),
            orderings: Vec::new(),
            page_size: DEFAULT_QUERY_PAGE_SIZE,
            page: 1,
            preview_ref: None,
        }
    }

    /// All documents of the `posts` custom type.
    pub fn posts() -> Self {
        Self::new(Predicate::document_type(&DocumentType::posts()))
    }

    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    pub fn fetch(mut self, field: impl Into<String>) -> Self {
        self.fetch.push(field.into());
        self
    }

    pub fn order_by(mut self, ordering: Ordering) -> Self {
        self.orderings.push(ordering);
        self
    }

    /// Sets the page size, clamped to what the API accepts.
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        self
    }

    pub fn page(mut self, page: u32) -> Self {
        self.page = page.max(1);
        self
    }

    pub fn with_ref(mut self, preview_ref: Option<PreviewRef>) -> Self {
        self.preview_ref = preview_ref;
        self
    }

    /// The `q` parameter.
    pub fn predicates_string(&self) -> String {
        let inner: String = self
            .predicates
            .iter()
            .map(Predicate::to_query_string)
            .collect();
        format!("[{}]", inner)
    }

    /// The `orderings` parameter, if any ordering was requested.
    pub fn orderings_string(&self) -> Option<String> {
        if self.orderings.is_empty() {
            return None;
        }
        let keys: Vec<String> = self
            .orderings
            .iter()
            .map(Ordering::to_query_fragment)
            .collect();
        Some(format!("[{}]", keys.join(", ")))
    }

    /// The `fetch` parameter, if the query projects fields.
    pub fn fetch_string(&self) -> Option<String> {
        if self.fetch.is_empty() {
            None
        } else {
            Some(self.fetch.join(","))
        }
    }

    /// Writes this query's parameters onto a search URL.
    ///
    /// `default_ref` is used unless the query carries its own preview ref.
    pub fn apply_to(&self, url: &mut Url, default_ref: &str) {
        let content_ref = self
            .preview_ref
            .as_ref()
            .map(PreviewRef::as_str)
            .unwrap_or(default_ref);

        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("ref", content_ref);
        pairs.append_pair("q", &self.predicates_string());
        if let Some(orderings) = self.orderings_string() {
            pairs.append_pair("orderings", &orderings);
        }
        if let Some(fetch) = self.fetch_string() {
            pairs.append_pair("fetch", &fetch);
        }
        pairs.append_pair("pageSize", &self.page_size.to_string());
        pairs.append_pair("page", &self.page.to_string());
    }

    /// A stable textual identity for caching responses to this query.
    pub fn cache_key(&self) -> String {
        format!(
            "q={}&orderings={}&fetch={}&pageSize={}&page={}&ref={}",
            self.predicates_string(),
            self.orderings_string().unwrap_or_default(),
            self.fetch_string().unwrap_or_default(),
            self.page_size,
            self.page,
            self.preview_ref
                .as_ref()
                .map(PreviewRef::as_str)
                .unwrap_or("master"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_home_listing_query() {
        let query = DocumentQuery::posts()
            .fetch("posts.title")
            .fetch("posts.subtitle")
            .fetch("posts.author")
            .order_by(Ordering::newest_first())
            .page_size(3)
            .page(1);

        assert_eq!(query.predicates_string(), r#"[[at(document.type, "posts")]]"#);
        assert_eq!(
            query.orderings_string().as_deref(),
            Some("[document.first_publication_date desc]")
        );
        assert_eq!(
            query.fetch_string().as_deref(),
            Some("posts.title,posts.subtitle,posts.author")
        );
    }

    #[test]
    fn test_date_predicates() {
        let date = PublicationDate::parse("2021-02-01T00:00:00+0000").unwrap();
        let query = DocumentQuery::posts().and(Predicate::date_after(PUBLICATION_DATE_FIELD, &date));

        assert_eq!(
            query.predicates_string(),
            r#"[[at(document.type, "posts")][date.after(document.first_publication_date, 1612137600000)]]"#
        );
    }

    #[test]
    fn test_page_size_is_clamped() {
        assert_eq!(DocumentQuery::posts().page_size(0).page_size, 1);
        assert_eq!(DocumentQuery::posts().page_size(500).page_size, 100);
        assert_eq!(DocumentQuery::posts().page(0).page, 1);
    }

    #[test]
    fn test_apply_to_prefers_preview_ref() {
        let mut url = Url::parse("https://blog.cdn.prismic.io/api/v2/documents/search").unwrap();
        let query = DocumentQuery::posts().with_ref(Some(PreviewRef::new("preview-ref").unwrap()));
        query.apply_to(&mut url, "master-ref");

        let params: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(params.contains(&("ref".to_string(), "preview-ref".to_string())));
        assert!(params.contains(&("pageSize".to_string(), "20".to_string())));
    }

    #[test]
    fn test_quotes_in_values_are_escaped() {
        let predicate = Predicate::at("my.posts.uid", r#"say-"hi""#);
        assert_eq!(
            predicate.to_query_string(),
            r#"[at(my.posts.uid, "say-\"hi\"")]"#
        );
    }
}
