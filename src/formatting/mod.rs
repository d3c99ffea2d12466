// src/formatting/mod.rs
//! Turns post view-models into what readers see: formatted dates, plain
//! text for word counts, and rendered HTML pages.

pub mod dates;
pub mod plain_text;
pub mod templates;

pub use templates::{ListingContext, SiteRenderer};
