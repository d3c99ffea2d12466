// src/preview.rs
//! Preview mode: reading the preview ref a browser carries, and leaving
//! preview mode again.

use crate::constants::{PREVIEW_COOKIE, TEMPORARY_REDIRECT};
use crate::types::PreviewRef;

/// An HTTP redirect, independent of any server library.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redirect {
    pub status: u16,
    pub location: String,
    /// `Set-Cookie` value to send along, if any.
    pub set_cookie: Option<String>,
}

/// Temporary redirect to the home page.
pub fn redirect_home() -> Redirect {
    Redirect {
        status: TEMPORARY_REDIRECT,
        location: "/".to_string(),
        set_cookie: None,
    }
}

/// Leaves preview mode: expires the preview cookie and sends the reader home.
///
/// Calling it without an active preview gives the same response.
pub fn exit_preview() -> Redirect {
    Redirect {
        set_cookie: Some(expired_cookie(PREVIEW_COOKIE)),
        ..redirect_home()
    }
}

fn expired_cookie(name: &str) -> String {
    format!(
        "{}=; Path=/; Max-Age=0; Expires=Thu, 01 Jan 1970 00:00:00 GMT; HttpOnly; SameSite=Lax",
        name
    )
}

/// Extracts the preview ref from a `Cookie` request header.
///
/// Malformed or empty values count as no preview.
pub fn preview_ref_from_cookies(cookie_header: &str) -> Option<PreviewRef> {
    cookie_header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == PREVIEW_COOKIE)
        .and_then(|(_, value)| PreviewRef::new(value.trim_matches('"')).ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_preview_redirects_home_and_clears_cookie() {
        let redirect = exit_preview();
        assert_eq!(redirect.status, 307);
        assert_eq!(redirect.location, "/");

        let cookie = redirect.set_cookie.unwrap();
        assert!(cookie.starts_with("spacetraveling.preview=;"));
        assert!(cookie.contains("Max-Age=0"));
    }

    #[test]
    fn test_exit_preview_is_idempotent() {
        assert_eq!(exit_preview(), exit_preview());
    }

    #[test]
    fn test_preview_ref_from_cookies() {
        let header = "theme=dark; spacetraveling.preview=YFPreview~abc; other=1";
        assert_eq!(
            preview_ref_from_cookies(header).map(|r| r.as_str().to_string()),
            Some("YFPreview~abc".to_string())
        );
        assert!(preview_ref_from_cookies("theme=dark").is_none());
        assert!(preview_ref_from_cookies("spacetraveling.preview=").is_none());
    }
}
