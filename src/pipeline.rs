// src/pipeline.rs
//! Pipeline capability traits: abstract the three stages of a site build.
//!
//! Each trait describes a single capability, enabling testing each stage in isolation.

use crate::error::AppError;
use crate::output::{OutputPlan, OutputReport};
use crate::site::SiteContent;

/// Retrieves everything the site shows: listing pages and posts.
#[async_trait::async_trait]
pub trait ContentSource {
    async fn fetch(&self) -> Result<SiteContent, AppError>;
}

/// Turns fetched content into a plan of pages to write.
pub trait PageComposer {
    fn compose(&self, content: &SiteContent) -> Result<OutputPlan, AppError>;
}

/// Writes planned pages to their destinations.
pub trait SiteDelivery {
    fn deliver(&self, plan: OutputPlan) -> Result<OutputReport, AppError>;
}
