// src/mapping.rs
//! Document mapper: raw API documents into post view-models.
//!
//! Mapping is total. Missing or mistyped fields become empty defaults
//! (`""`, `[]`, `None`) and an unreadable timestamp is logged and dropped;
//! nothing here returns an error.

use crate::api::responses::RawDocument;
use crate::model::{AdjacentPostRef, ContentSection, PostDetail, PostSummary};
use crate::types::{PostUid, PublicationDate};
use serde_json::Value;

/// Maps a listing document (title, subtitle, author).
pub fn map_summary(document: &RawDocument) -> PostSummary {
    PostSummary {
        uid: PostUid::from_document(document.uid.as_str()),
        first_publication_date: convert_timestamp(document.first_publication_date.as_deref()),
        title: text_field(&document.data, "title"),
        subtitle: text_field(&document.data, "subtitle"),
        author: text_field(&document.data, "author"),
    }
}

/// Maps a page of listing documents, preserving their order.
pub fn map_summaries(documents: &[RawDocument]) -> Vec<PostSummary> {
    documents.iter().map(map_summary).collect()
}

/// Maps a full post document. Adjacent posts are resolved separately.
pub fn map_detail(document: &RawDocument) -> PostDetail {
    let data = &document.data;
    PostDetail {
        uid: PostUid::from_document(document.uid.as_str()),
        first_publication_date: convert_timestamp(document.first_publication_date.as_deref()),
        last_publication_date: convert_timestamp(document.last_publication_date.as_deref()),
        title: text_field(data, "title"),
        subtitle: text_field(data, "subtitle"),
        author: text_field(data, "author"),
        banner_url: data
            .get("banner")
            .and_then(|banner| banner.get("url"))
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        content_sections: data
            .get("content")
            .and_then(Value::as_array)
            .map(|sections| sections.iter().map(convert_section).collect())
            .unwrap_or_default(),
        previous_post: None,
        next_post: None,
    }
}

/// Maps the single result of an adjacent-post lookup.
pub fn map_adjacent(document: &RawDocument) -> AdjacentPostRef {
    AdjacentPostRef {
        uid: PostUid::from_document(document.uid.as_str()),
        title: text_field(&document.data, "title"),
    }
}

fn convert_section(section: &Value) -> ContentSection {
    ContentSection {
        heading: section
            .get("heading")
            .map(flatten_text)
            .unwrap_or_default(),
        body_html: section
            .get("body")
            .and_then(Value::as_array)
            .map(|fragments| fragments.iter().map(convert_fragment).collect())
            .unwrap_or_default(),
    }
}

/// A body fragment is either a rich-text block (`{ "type", "text", "spans" }`)
/// or, in hand-written fixtures, a bare string.
fn convert_fragment(fragment: &Value) -> String {
    match fragment {
        Value::String(text) => text.clone(),
        other => other
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    }
}

fn text_field(data: &Value, key: &str) -> String {
    data.get(key).map(flatten_text).unwrap_or_default()
}

/// Reads a key text field: plain strings as-is, rich-text arrays joined
/// block by block with a single space.
fn flatten_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(blocks) => blocks
            .iter()
            .filter_map(|block| match block {
                Value::String(text) => Some(text.as_str()),
                other => other.get("text").and_then(Value::as_str),
            })
            .collect::<Vec<_>>()
            .join(" "),
        _ => String::new(),
    }
}

fn convert_timestamp(raw: Option<&str>) -> Option<PublicationDate> {
    let raw = raw?;
    match PublicationDate::parse(raw) {
        Ok(date) => Some(date),
        Err(e) => {
            log::warn!("Ignoring unreadable publication date: {}", e);
            None
        }
    }
}
