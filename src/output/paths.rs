// src/output/paths.rs
//! Pure functions for site paths: where each page is written and the URL
//! it is served under.
//!
//! This module performs no I/O except canonicalization in [`is_safe_path`].

use crate::types::PostUid;
use std::path::{Component, Path, PathBuf};

const INDEX_FILE: &str = "index.html";

/// File for listing page `page_number` (1-based). Page 1 is the site root.
pub fn home_page_path(output_dir: &Path, page_number: usize) -> PathBuf {
    if page_number <= 1 {
        output_dir.join(INDEX_FILE)
    } else {
        output_dir
            .join("page")
            .join(page_number.to_string())
            .join(INDEX_FILE)
    }
}

/// URL of listing page `page_number`.
pub fn home_page_href(page_number: usize) -> String {
    if page_number <= 1 {
        "/".to_string()
    } else {
        format!("/page/{}/", page_number)
    }
}

/// The listing page a request path names, if it names one.
///
/// Accepts `/`, `/index.html` and `/page/N` with or without a trailing
/// slash or `index.html`.
pub fn listing_page_number(request_path: &str) -> Option<usize> {
    let path = request_path
        .split(['?', '#'])
        .next()
        .unwrap_or_default()
        .trim_end_matches(INDEX_FILE)
        .trim_end_matches('/');

    if path.is_empty() {
        return Some(1);
    }

    path.strip_prefix("/page/")?
        .parse::<usize>()
        .ok()
        .filter(|page_number| *page_number >= 1)
}

/// File a post page is written to.
pub fn post_path(output_dir: &Path, uid: &PostUid) -> PathBuf {
    output_dir
        .join("post")
        .join(sanitize_segment(uid.as_str()))
        .join(INDEX_FILE)
}

/// URL of a post page.
pub fn post_href(uid: &PostUid) -> String {
    format!("/post/{}", sanitize_segment(uid.as_str()))
}

/// The placeholder shown while a post that was not built ahead of time loads.
pub fn fallback_path(output_dir: &Path) -> PathBuf {
    output_dir.join("post").join("fallback.html")
}

/// Sanitizes a string to be safe as a single path segment.
pub fn sanitize_segment(name: &str) -> String {
    let mut safe_name = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' | '#' | '%' => '_',
            c if c.is_control() || c.is_whitespace() => '_',
            c => c,
        })
        .collect::<String>();

    safe_name = safe_name.trim_matches('.').to_string();

    if safe_name.len() > 100 {
        let cut = (0..=100)
            .rev()
            .find(|i| safe_name.is_char_boundary(*i))
            .unwrap_or(0);
        safe_name.truncate(cut);
    }

    if safe_name.is_empty() {
        safe_name = "unnamed".to_string();
    }

    safe_name
}

/// Maps a request path onto a file under `base_dir`.
///
/// Directory-style paths resolve to their `index.html`. Returns `None` for
/// paths that would escape `base_dir`.
pub fn resolve_request_path(base_dir: &Path, request_path: &str) -> Option<PathBuf> {
    let path_only = request_path.split(['?', '#']).next().unwrap_or_default();
    let relative = path_only.trim_start_matches('/');

    if Path::new(relative)
        .components()
        .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
    {
        return None;
    }

    let mut candidate = base_dir.join(relative);
    if relative.is_empty() || path_only.ends_with('/') || candidate.is_dir() {
        candidate = candidate.join(INDEX_FILE);
    }

    is_safe_path(&candidate, base_dir).then_some(candidate)
}

/// Checks if a path lies within `base_dir`.
pub fn is_safe_path(path: &Path, base_dir: &Path) -> bool {
    if let (Ok(canonical_path), Ok(canonical_base)) = (path.canonicalize(), base_dir.canonicalize())
    {
        canonical_path.starts_with(&canonical_base)
    } else {
        // Not on disk yet: compare lexically
        normalize_path(path).starts_with(normalize_path(base_dir))
    }
}

/// Normalizes a path by resolving .. and . components.
fn normalize_path(path: &Path) -> PathBuf {
    let mut components = Vec::new();

    for component in path.components() {
        match component {
            Component::ParentDir => {
                components.pop();
            }
            Component::CurDir => {}
            c => components.push(c),
        }
    }

    components.into_iter().collect()
}
