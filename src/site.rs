// src/site.rs
//! Static site build: fetch → compose → deliver.
//!
//! The listing is walked page by page through a [`PostFeed`], so listing
//! page N holds every post accumulated up to it. Every listed post gets its
//! own page, plus one placeholder page for posts that were not built.

use crate::api::{CachedContentClient, ContentRepository, InMemoryRepository, PrismicHttpClient};
use crate::config::{ContentOrigin, SiteConfig};
use crate::constants::POST_FETCH_CONCURRENCY;
use crate::error::{AppError, Result};
use crate::formatting::{ListingContext, SiteRenderer};
use crate::model::PaginationState;
use crate::output::{
    self, fallback_path, home_page_href, home_page_path, post_path, OutputPlan, OutputReport,
};
use crate::pagination::{listing_query, LoadOutcome, PostFeed};
use crate::pipeline::{ContentSource, PageComposer, SiteDelivery};
use crate::post::{assemble_post, PostPage};
use crate::types::PostUid;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashSet;
use std::sync::Arc;

/// Everything fetched for one build.
#[derive(Debug, Clone, Default)]
pub struct SiteContent {
    /// The listing after each loaded page, first page first.
    pub listing_pages: Vec<PaginationState>,
    pub posts: Vec<PostPage>,
    pub preview: bool,
}

/// What a finished build produced.
#[derive(Debug, Clone)]
pub struct BuildSummary {
    pub listing_pages: usize,
    pub posts: usize,
    pub report: OutputReport,
}

/// Opens the configured content source, behind the disk cache when enabled.
pub async fn connect(config: &SiteConfig) -> Result<Arc<dyn ContentRepository>> {
    match &config.origin {
        ContentOrigin::Fixture(path) => {
            log::info!("Reading content from fixture {}", path.display());
            Ok(Arc::new(InMemoryRepository::from_fixture(path)?))
        }
        ContentOrigin::Prismic {
            endpoint,
            access_token,
        } => {
            log::info!("Reading content from {}", endpoint);
            let client: Arc<dyn ContentRepository> =
                Arc::new(PrismicHttpClient::new(endpoint.clone(), access_token.clone())?);
            if config.cache_enabled {
                log::info!("Cache enabled (TTL: {}s)", config.cache_ttl);
                Ok(Arc::new(
                    CachedContentClient::new(client, config.cache_ttl).await?,
                ))
            } else {
                log::info!("Cache disabled: all requests go to the Prismic API");
                Ok(client)
            }
        }
    }
}

/// Builds the site from the configured content source.
pub async fn build_site(config: &SiteConfig) -> Result<BuildSummary> {
    let repository = connect(config).await?;
    build_with(config, repository).await
}

/// Builds the site from an already opened repository.
pub async fn build_with(
    config: &SiteConfig,
    repository: Arc<dyn ContentRepository>,
) -> Result<BuildSummary> {
    let site = StaticSite::new(config, repository)?;

    let content = site.fetch().await?;
    let plan = site.compose(&content)?;
    let report = site.deliver(plan)?;

    Ok(BuildSummary {
        listing_pages: content.listing_pages.len(),
        posts: content.posts.len(),
        report,
    })
}

/// Orchestrates the retrieval, rendering, and delivery of the blog.
pub struct StaticSite<'a> {
    config: &'a SiteConfig,
    repository: Arc<dyn ContentRepository>,
    renderer: SiteRenderer,
}

impl<'a> StaticSite<'a> {
    pub fn new(config: &'a SiteConfig, repository: Arc<dyn ContentRepository>) -> Result<Self> {
        let renderer = SiteRenderer::load(config.template_dir.as_deref())?;
        Ok(Self {
            config,
            repository,
            renderer,
        })
    }

    /// Loads the first listing page, then every further page its cursor leads to.
    async fn fetch_listing(&self) -> Result<Vec<PaginationState>> {
        let query = listing_query(self.config.page_size, self.config.preview_ref.clone());
        let feed = PostFeed::load_first_page(self.repository.as_ref(), &query).await?;
        let mut pages = vec![feed.snapshot()];

        while feed.can_load_more() {
            match feed.load_more(self.repository.as_ref()).await? {
                LoadOutcome::Loaded { added: 0 } => {
                    log::warn!("Listing page {} came back empty; stopping", pages.len() + 1);
                    break;
                }
                LoadOutcome::Loaded { .. } => pages.push(feed.snapshot()),
                LoadOutcome::Exhausted => break,
            }
        }

        log::info!("Listing spans {} page(s)", pages.len());
        Ok(pages)
    }

    /// Assembles every listed post, a few at a time.
    async fn fetch_posts(&self, listing: &PaginationState) -> Result<Vec<PostPage>> {
        let mut seen = HashSet::new();
        let uids: Vec<PostUid> = listing
            .items
            .iter()
            .map(|post| &post.uid)
            .filter(|uid| {
                if uid.is_empty() {
                    log::warn!("Skipping a listed post without UID");
                    return false;
                }
                seen.insert(*uid)
            })
            .cloned()
            .collect();

        let repository = self.repository.as_ref();
        let preview_ref = self.config.preview_ref.as_ref();
        let pages: Vec<Option<PostPage>> = stream::iter(uids)
            .map(move |uid| async move { assemble_post(repository, &uid, preview_ref).await })
            .buffered(POST_FETCH_CONCURRENCY)
            .try_collect()
            .await?;

        Ok(pages.into_iter().flatten().collect())
    }
}

#[async_trait::async_trait]
impl ContentSource for StaticSite<'_> {
    async fn fetch(&self) -> Result<SiteContent, AppError> {
        let listing_pages = self.fetch_listing().await?;
        let posts = match listing_pages.last() {
            Some(full_listing) => self.fetch_posts(full_listing).await?,
            None => Vec::new(),
        };

        log::info!("Fetched {} post(s)", posts.len());
        Ok(SiteContent {
            listing_pages,
            posts,
            preview: self.config.is_preview(),
        })
    }
}

impl PageComposer for StaticSite<'_> {
    fn compose(&self, content: &SiteContent) -> Result<OutputPlan, AppError> {
        let output_dir = &self.config.output_dir;
        let mut plan = OutputPlan::new();

        for (index, state) in content.listing_pages.iter().enumerate() {
            let page_number = index + 1;
            let load_more_href = (state.has_more_pages()
                && page_number < content.listing_pages.len())
            .then(|| home_page_href(page_number + 1));

            let html = self.renderer.render_home(
                state,
                ListingContext {
                    load_more_href: load_more_href.as_deref(),
                    preview: content.preview,
                },
            )?;
            plan = plan.with_file(home_page_path(output_dir, page_number), html.into_string());
        }

        for page in &content.posts {
            let html = self.renderer.render_post(page)?;
            plan = plan.with_file(post_path(output_dir, &page.detail.uid), html.into_string());
        }

        let fallback = self.renderer.render_fallback(false)?;
        plan = plan.with_file(fallback_path(output_dir), fallback.into_string());

        log::debug!("Planned {} file(s)", plan.len());
        Ok(plan)
    }
}

impl SiteDelivery for StaticSite<'_> {
    fn deliver(&self, plan: OutputPlan) -> Result<OutputReport, AppError> {
        let report = output::deliver(plan);

        if !report.is_success() {
            return Err(AppError::DeliveryFailed {
                failures: report.failure_messages(),
            });
        }

        Ok(report)
    }
}
