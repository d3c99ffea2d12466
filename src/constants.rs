// src/constants.rs
//! Domain constants that define the operational boundaries of the blog.
//!
//! Each constant is named for the domain concept it constrains, not its
//! technical role.

// ---------------------------------------------------------------------------
// Content API boundaries
// ---------------------------------------------------------------------------

/// The Prismic custom type that holds blog posts.
pub const POST_DOCUMENT_TYPE: &str = "posts";

/// How many posts the home page lists before offering "load more".
pub const HOME_PAGE_SIZE: u32 = 3;

/// Adjacent-post lookups only ever need the single nearest document.
pub const ADJACENT_POST_PAGE_SIZE: u32 = 1;

/// Prismic refuses page sizes above 100.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Field the listing and adjacency queries order and filter on.
pub const PUBLICATION_DATE_FIELD: &str = "document.first_publication_date";

/// How long a fetched response stays fresh, matching the two-hour
/// revalidation window of the deployed site.
pub const REVALIDATE_SECS: u64 = 2 * 60 * 60;

// ---------------------------------------------------------------------------
// Reading time
// ---------------------------------------------------------------------------

/// Average adult reading speed used for the "N min" estimate.
pub const WORDS_PER_MINUTE: usize = 200;

// ---------------------------------------------------------------------------
// Load-more retries
// ---------------------------------------------------------------------------

/// Attempts made for a single "load more" fetch before giving up.
pub const LOAD_MORE_MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubles on each further attempt.
pub const LOAD_MORE_INITIAL_DELAY_MS: u64 = 250;

/// Upper bound on the retry delay.
pub const LOAD_MORE_MAX_DELAY_MS: u64 = 2_000;

// ---------------------------------------------------------------------------
// Site
// ---------------------------------------------------------------------------

/// Suffix appended to every page title.
pub const SITE_NAME: &str = "spacetraveling";

/// Cookie that carries the active preview ref while serving.
pub const PREVIEW_COOKIE: &str = "spacetraveling.preview";

/// Status used for every redirect home (temporary, method preserving).
pub const TEMPORARY_REDIRECT: u16 = 307;

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 500;

/// Post pages fetched concurrently during a build.
pub const POST_FETCH_CONCURRENCY: usize = 4;

/// Route that leaves preview mode.
pub const EXIT_PREVIEW_PATH: &str = "/api/exit-preview";

/// Unknown post routes remembered at once while serving.
pub const MAX_MISSING_ROUTES: usize = 1024;

/// How long a resolved master ref is trusted before the API is asked again.
pub const MASTER_REF_TTL_SECS: u64 = 5 * 60;
