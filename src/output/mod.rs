// src/output/mod.rs
//! Output handling with clear separation of planning and execution.
//!
//! Builds produce an [`OutputPlan`] (pure), which [`deliver`] then executes.

mod paths;
mod types;
mod writer;

// Re-export the public interface
pub use paths::{
    fallback_path, home_page_href, home_page_path, is_safe_path, listing_page_number, post_href,
    post_path, resolve_request_path, sanitize_segment,
};
pub use types::{DeliveryTarget, OutputPlan, OutputReport};
pub use writer::{deliver, write_file};
