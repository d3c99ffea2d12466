// src/lib.rs
//! spacetraveling library: a blog whose posts live in a Prismic repository.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `ValidationError`
//! - **Configuration**: `SiteConfig`, `ServeConfig`
//! - **Domain model**: `PostSummary`, `PostDetail`, `PaginationState`
//! - **API client**: `ContentRepository`, `PrismicHttpClient`, `InMemoryRepository`
//! - **Assembly**: `PostFeed`, `assemble_post`, `PostPageState`
//! - **Site**: `build_site`, `serve`

pub mod api;
pub mod config;
pub mod constants;
pub mod error;
pub mod error_recovery;
pub mod formatting;
pub mod mapping;
pub mod model;
pub mod output;
pub mod pagination;
pub mod pipeline;
pub mod post;
pub mod preview;
pub mod serve;
pub mod site;
pub mod types;

// --- Error Handling ---
pub use crate::error::{AppError, PrismicErrorCode};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{CommandLineInput, ContentOrigin, ServeConfig, SiteCommand, SiteConfig};

// --- Domain Model ---
pub use crate::model::{AdjacentPostRef, ContentSection, PaginationState, PostDetail, PostSummary};

// --- Domain Types ---
pub use crate::types::{
    AccessToken, DocumentType, PostUid, PreviewRef, PublicationDate, RenderedPage, ValidatedUrl,
};

// --- API Client ---
pub use crate::api::{
    query::{DocumentQuery, Ordering, Predicate},
    responses::{RawDocument, SearchResponse},
    CachedContentClient, ContentRepository, InMemoryRepository, PrismicHttpClient,
};

// --- Assembly ---
pub use crate::mapping::{map_detail, map_summaries, map_summary};
pub use crate::pagination::{merge, LoadOutcome, PostFeed};
pub use crate::post::{assemble_post, estimate_reading_time, PostPage, PostPageState};
pub use crate::preview::{exit_preview, Redirect};

// --- Formatting ---
pub use crate::formatting::{ListingContext, SiteRenderer};

// --- Site ---
pub use crate::pipeline::{ContentSource, PageComposer, SiteDelivery};
pub use crate::serve::{serve, IncomingRequest, Reply, SiteServer};
pub use crate::site::{build_site, build_with, BuildSummary, SiteContent, StaticSite};
