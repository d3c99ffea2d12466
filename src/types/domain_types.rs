// src/types/domain_types.rs
//! Domain-specific newtypes for type safety and validation.

use super::ValidationError;
use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Access token for a private Prismic repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken(String);

impl AccessToken {
    /// Create a new access token with validation
    pub fn new(token: impl Into<String>) -> Result<Self, ValidationError> {
        let token = token.into();

        if token.is_empty() {
            return Err(ValidationError::InvalidAccessToken {
                reason: "access token cannot be empty".to_string(),
            });
        }

        if token.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidAccessToken {
                reason: "access token cannot contain whitespace".to_string(),
            });
        }

        Ok(Self(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccessToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Redact token in display
        let prefix: String = self.0.chars().take(6).collect();
        write!(f, "{}...", prefix)
    }
}

/// Validated URL type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedUrl(Url);

impl Serialize for ValidatedUrl {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.0.as_str().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ValidatedUrl {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        ValidatedUrl::parse(&s).map_err(serde::de::Error::custom)
    }
}

impl ValidatedUrl {
    /// Create a new validated URL
    pub fn parse(url: &str) -> Result<Self, ValidationError> {
        match Url::parse(url) {
            Ok(parsed_url) => {
                if parsed_url.scheme() != "http" && parsed_url.scheme() != "https" {
                    return Err(ValidationError::InvalidUrl {
                        url: url.to_string(),
                        reason: "Only HTTP and HTTPS URLs are supported".to_string(),
                    });
                }
                Ok(Self(parsed_url))
            }
            Err(e) => Err(ValidationError::InvalidUrl {
                url: url.to_string(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn as_url(&self) -> &Url {
        &self.0
    }
}

impl fmt::Display for ValidatedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A Prismic content ref (a release or preview session) to query against
/// instead of the master ref.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PreviewRef(String);

impl PreviewRef {
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() || trimmed.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidPreviewRef(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PreviewRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// When a document was first (or last) published.
///
/// Prismic emits timestamps like `2021-03-25T19:25:28+0000`, which is not
/// strict RFC 3339, so parsing accepts both forms plus bare `YYYY-MM-DD`
/// dates (read as midnight UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PublicationDate(DateTime<FixedOffset>);

impl PublicationDate {
    pub fn parse(raw: &str) -> Result<Self, ValidationError> {
        let trimmed = raw.trim();

        if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
            return Ok(Self(dt));
        }

        for format in ["%Y-%m-%dT%H:%M:%S%z", "%Y-%m-%dT%H:%M:%S%.f%z"] {
            if let Ok(dt) = DateTime::parse_from_str(trimmed, format) {
                return Ok(Self(dt));
            }
        }

        NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|naive| Self(naive.and_utc().fixed_offset()))
            .ok_or_else(|| ValidationError::InvalidTimestamp(raw.to_string()))
    }

    pub fn from_datetime(dt: DateTime<FixedOffset>) -> Self {
        Self(dt)
    }

    pub fn as_datetime(&self) -> &DateTime<FixedOffset> {
        &self.0
    }

    pub fn to_utc(&self) -> DateTime<Utc> {
        self.0.with_timezone(&Utc)
    }

    /// Milliseconds since the Unix epoch, the form Prismic date predicates take.
    pub fn timestamp_millis(&self) -> i64 {
        self.0.timestamp_millis()
    }

    pub fn to_rfc3339(&self) -> String {
        self.0.to_rfc3339()
    }
}

impl fmt::Display for PublicationDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl Serialize for PublicationDate {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        self.to_rfc3339().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for PublicationDate {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PublicationDate::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// The final output of the render stage: one HTML document ready for delivery.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedPage(String);

impl RenderedPage {
    pub fn new(content: String) -> Self {
        Self(content)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for RenderedPage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_access_token_validation() {
        assert!(AccessToken::new("MC5ZRk1aZ0JJQUFDTUE3").is_ok());
        assert!(AccessToken::new("").is_err());
        assert!(AccessToken::new("has space").is_err());
    }

    #[test]
    fn test_access_token_is_redacted() {
        let token = AccessToken::new("MC5ZRk1aZ0JJQUFDTUE3").unwrap();
        assert_eq!(token.to_string(), "MC5ZRk...");
    }

    #[test]
    fn test_url_validation() {
        assert!(ValidatedUrl::parse("https://spacetraveling.cdn.prismic.io/api/v2").is_ok());
        assert!(ValidatedUrl::parse("http://localhost:8080").is_ok());
        assert!(ValidatedUrl::parse("ftp://example.com").is_err());
        assert!(ValidatedUrl::parse("not a url").is_err());
    }

    #[test]
    fn test_publication_date_accepts_prismic_offsets() {
        let prismic = PublicationDate::parse("2021-03-25T19:25:28+0000").unwrap();
        let rfc = PublicationDate::parse("2021-03-25T19:25:28+00:00").unwrap();
        assert_eq!(prismic, rfc);
        assert_eq!(prismic.timestamp_millis(), 1_616_700_328_000);
    }

    #[test]
    fn test_publication_date_accepts_bare_dates() {
        let date = PublicationDate::parse("2021-02-01").unwrap();
        assert_eq!(date.to_rfc3339(), "2021-02-01T00:00:00+00:00");
    }

    #[test]
    fn test_publication_date_rejects_garbage() {
        assert!(PublicationDate::parse("yesterday").is_err());
        assert!(PublicationDate::parse("").is_err());
    }

    #[test]
    fn test_preview_ref_validation() {
        assert!(PreviewRef::new("YFM3ABIAACUA7XqG").is_ok());
        assert!(PreviewRef::new("  ").is_err());
        assert!(PreviewRef::new("two words").is_err());
    }
}
