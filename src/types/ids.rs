use super::ValidationError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Prismic UIDs are URL slugs: lowercase letters, digits, `-` and `_`.
static UID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9_-]*$").expect("UID regex is a valid pattern")
});

/// The unique, human-readable identifier of a post document.
///
/// UIDs coming back from the content API are taken as-is (mapping never
/// fails); UIDs coming from outside (a URL path, the command line) go
/// through [`PostUid::parse`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostUid(String);

impl PostUid {
    /// Validates a UID taken from an untrusted source.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let cleaned = input.trim().trim_matches('/');

        if cleaned.is_empty() {
            return Err(ValidationError::EmptyField("uid"));
        }

        if !UID_PATTERN.is_match(cleaned) {
            return Err(ValidationError::InvalidUid {
                uid: input.to_string(),
                reason: "UIDs may only contain lowercase letters, digits, '-' and '_'"
                    .to_string(),
            });
        }

        Ok(Self(cleaned.to_string()))
    }

    /// Wraps a UID exactly as the content API returned it.
    pub fn from_document(uid: impl Into<String>) -> Self {
        Self(uid.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for PostUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A custom type name in the Prismic repository (e.g. `posts`).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentType(String);

impl DocumentType {
    pub fn new(name: impl Into<String>) -> Result<Self, ValidationError> {
        let name = name.into();
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(ValidationError::InvalidDocumentType(name));
        }
        Ok(Self(name))
    }

    /// The custom type every blog post is stored under.
    pub fn posts() -> Self {
        Self(crate::constants::POST_DOCUMENT_TYPE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
