// src/serve.rs
//! Serves the built site and renders posts that were not built on demand.
//!
//! Request resolution order:
//! 1. `/api/exit-preview` leaves preview mode
//! 2. With a preview cookie, listing pages and `/post/<uid>` are rendered
//!    live against the preview ref
//! 3. A file under the output directory is served as-is
//! 4. `/post/<uid>` without a file shows the fallback page while the post
//!    is fetched in the background, then the post itself. A post found
//!    missing redirects home until the revalidation window has passed.
//! 5. Anything else is a 404
//!
//! `tiny_http` is blocking, so the accept loop runs on a blocking thread and
//! hands every request back to the tokio runtime.

use crate::api::ContentRepository;
use crate::config::ServeConfig;
use crate::constants::{EXIT_PREVIEW_PATH, HOME_PAGE_SIZE, MAX_MISSING_ROUTES, REVALIDATE_SECS};
use crate::error::{AppError, Result};
use crate::formatting::{ListingContext, SiteRenderer};
use crate::output::{
    home_page_href, listing_page_number, post_path, resolve_request_path, write_file,
};
use crate::pagination::{listing_query, LoadOutcome, PostFeed};
use crate::post::{assemble_post, PostPage, PostPageState};
use crate::preview::{exit_preview, preview_ref_from_cookies, redirect_home, Redirect};
use crate::site::{build_site, connect};
use crate::types::{PostUid, PreviewRef};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tiny_http::{Header, Request, Response, Server, StatusCode};
use tokio::runtime::Handle;

const POST_ROUTE_PREFIX: &str = "/post/";

/// Builds the site (unless told not to) and serves it until Ctrl+C.
pub async fn serve(config: &ServeConfig) -> Result<()> {
    if config.build_first {
        let summary = build_site(&config.site).await?;
        log::info!(
            "Built {} listing page(s) and {} post(s)",
            summary.listing_pages,
            summary.posts
        );
    }

    let repository = connect(&config.site).await?;
    let renderer = SiteRenderer::load(config.site.template_dir.as_deref())?;
    let site = Arc::new(
        SiteServer::new(config.site.output_dir.clone(), repository, renderer)
            .with_page_size(config.site.page_size),
    );

    let server = Server::http(config.addr.as_str())
        .map_err(|e| AppError::Server(format!("Failed to bind {}: {}", config.addr, e)))?;
    let server = Arc::new(server);
    log::info!(
        "Serving {} at http://{}",
        config.site.output_dir.display(),
        config.addr
    );

    let listener = Arc::clone(&server);
    let runtime = Handle::current();
    let accept_loop = tokio::task::spawn_blocking(move || {
        for request in listener.incoming_requests() {
            if let Err(e) = handle_request(&runtime, &site, request) {
                log::warn!("Request error: {}", e);
            }
        }
    });

    tokio::signal::ctrl_c().await?;
    log::info!("Shutting down...");
    server.unblock();

    accept_loop
        .await
        .map_err(|e| AppError::Server(format!("Accept loop panicked: {}", e)))
}

/// The parts of an HTTP request routing looks at.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IncomingRequest {
    pub method: String,
    pub url: String,
    /// Raw `Cookie` header, if sent.
    pub cookie: Option<String>,
}

impl IncomingRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: "GET".to_string(),
            url: url.into(),
            cookie: None,
        }
    }

    pub fn with_cookie(mut self, cookie: impl Into<String>) -> Self {
        self.cookie = Some(cookie.into());
        self
    }

    /// The URL without query string or fragment.
    fn path(&self) -> &str {
        self.url.split(['?', '#']).next().unwrap_or_default()
    }

    fn from_tiny_http(request: &Request) -> Self {
        let cookie = request
            .headers()
            .iter()
            .find(|header| header.field.equiv("Cookie"))
            .map(|header| header.value.as_str().to_string());

        Self {
            method: request.method().to_string(),
            url: request.url().to_string(),
            cookie,
        }
    }
}

/// What to answer a request with.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    File(PathBuf),
    Html { status: u16, body: String },
    Redirect(Redirect),
    NotFound,
}

/// Where an on-demand post route stands.
#[derive(Debug)]
enum RouteState {
    Page(PostPageState),
    /// The post did not exist when last fetched; requests go home until the
    /// entry expires.
    Missing { since: Instant },
}

impl RouteState {
    fn missing_since(&self) -> Option<Instant> {
        match self {
            RouteState::Missing { since } => Some(*since),
            RouteState::Page(_) => None,
        }
    }
}

/// Routes requests against the output directory and the content repository.
pub struct SiteServer {
    output_dir: PathBuf,
    repository: Arc<dyn ContentRepository>,
    renderer: SiteRenderer,
    page_size: u32,
    routes: Mutex<HashMap<PostUid, RouteState>>,
    missing_ttl: Duration,
    missing_capacity: usize,
}

impl SiteServer {
    pub fn new(
        output_dir: PathBuf,
        repository: Arc<dyn ContentRepository>,
        renderer: SiteRenderer,
    ) -> Self {
        Self {
            output_dir,
            repository,
            renderer,
            page_size: HOME_PAGE_SIZE,
            routes: Mutex::new(HashMap::new()),
            missing_ttl: Duration::from_secs(REVALIDATE_SECS),
            missing_capacity: MAX_MISSING_ROUTES,
        }
    }

    /// Posts per listing page when rendering previews.
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// How long an unknown post stays remembered, and how many are
    /// remembered at once.
    pub fn with_missing_policy(mut self, ttl: Duration, capacity: usize) -> Self {
        self.missing_ttl = ttl;
        self.missing_capacity = capacity.max(1);
        self
    }

    /// Decides the reply for one request.
    pub async fn route(self: &Arc<Self>, request: &IncomingRequest) -> Result<Reply> {
        if !matches!(request.method.as_str(), "GET" | "HEAD") {
            return Ok(Reply::Html {
                status: 405,
                body: "405 Method Not Allowed".to_string(),
            });
        }

        let path = request.path();
        if path == EXIT_PREVIEW_PATH {
            log::info!("Leaving preview mode");
            return Ok(Reply::Redirect(exit_preview()));
        }

        let post_uid = path.strip_prefix(POST_ROUTE_PREFIX);
        let preview_ref = request
            .cookie
            .as_deref()
            .and_then(preview_ref_from_cookies);

        if let Some(preview_ref) = preview_ref {
            if let Some(page_number) = listing_page_number(path) {
                log::debug!("Rendering preview of listing page {}", page_number);
                return self.preview_listing(page_number, preview_ref).await;
            }
            if let Some(raw_uid) = post_uid {
                let Ok(uid) = PostUid::parse(raw_uid) else {
                    return Ok(Reply::Redirect(redirect_home()));
                };
                log::debug!("Rendering preview of {}", uid);
                return match assemble_post(self.repository.as_ref(), &uid, Some(&preview_ref))
                    .await?
                {
                    Some(page) => self.render_ready(&page),
                    None => Ok(Reply::Redirect(redirect_home())),
                };
            }
        }

        if let Some(file) = resolve_request_path(&self.output_dir, path) {
            if file.is_file() {
                return Ok(Reply::File(file));
            }
        }

        match post_uid {
            Some(raw_uid) => match PostUid::parse(raw_uid) {
                Ok(uid) => self.post_on_demand(uid),
                Err(e) => {
                    log::debug!("Rejected post route {}: {}", path, e);
                    Ok(Reply::Redirect(redirect_home()))
                }
            },
            None => Ok(Reply::NotFound),
        }
    }

    /// Answers a post route that has no file yet, starting its fetch on
    /// first sight.
    fn post_on_demand(self: &Arc<Self>, uid: PostUid) -> Result<Reply> {
        let ready = {
            let mut routes = self.routes.lock();
            match routes.get(&uid) {
                Some(RouteState::Missing { since }) if since.elapsed() < self.missing_ttl => {
                    return Ok(Reply::Redirect(redirect_home()))
                }
                Some(RouteState::Page(state)) => state.page().cloned(),
                _ => {
                    routes.insert(uid.clone(), RouteState::Page(PostPageState::LoadingFallback));
                    log::info!("Fetching post {} on demand", uid);
                    let server = Arc::clone(self);
                    tokio::spawn(async move { server.fetch_on_demand(uid).await });
                    None
                }
            }
        };

        match ready {
            Some(page) => self.render_ready(&page),
            None => {
                let fallback = self.renderer.render_fallback(true)?;
                Ok(Reply::Html {
                    status: 200,
                    body: fallback.into_string(),
                })
            }
        }
    }

    /// Fetches a post in the background and settles its route.
    async fn fetch_on_demand(&self, uid: PostUid) {
        let fetched = match assemble_post(self.repository.as_ref(), &uid, None).await {
            Ok(fetched) => fetched,
            Err(e) => {
                log::warn!("Fetching post {} failed: {}", uid, e);
                self.routes.lock().remove(&uid);
                return;
            }
        };

        if let Some(page) = &fetched {
            if let Err(e) = self.persist(page) {
                log::warn!("Could not write post {}: {}", uid, e);
            }
        }

        let mut routes = self.routes.lock();
        let state = match routes.remove(&uid) {
            Some(RouteState::Page(state)) => state,
            _ => PostPageState::LoadingFallback,
        };

        match state.complete(fetched, &uid) {
            Ok(ready) => {
                log::info!("Post {} is ready", uid);
                routes.insert(uid, RouteState::Page(ready));
            }
            Err(AppError::PostNotFound { .. }) => self.remember_missing(&mut routes, uid),
            Err(e) => log::warn!("Post {} not settled: {}", uid, e),
        }
    }

    /// Records an unknown post, dropping expired entries first and the
    /// oldest one when still full.
    fn remember_missing(&self, routes: &mut HashMap<PostUid, RouteState>, uid: PostUid) {
        routes.retain(|_, state| {
            state
                .missing_since()
                .map_or(true, |since| since.elapsed() < self.missing_ttl)
        });

        let mut missing: Vec<(&PostUid, Instant)> = routes
            .iter()
            .filter_map(|(uid, state)| state.missing_since().map(|since| (uid, since)))
            .collect();
        if missing.len() >= self.missing_capacity {
            missing.sort_by_key(|(_, since)| *since);
            let evicted: Vec<PostUid> = missing
                .iter()
                .take(missing.len() + 1 - self.missing_capacity)
                .map(|(uid, _)| (*uid).clone())
                .collect();
            for old in evicted {
                log::debug!("Forgetting missing post {}", old);
                routes.remove(&old);
            }
        }

        routes.insert(uid, RouteState::Missing { since: Instant::now() });
    }

    /// Renders listing page `page_number` against a preview ref, walking
    /// the cursors the way repeated "load more" clicks would.
    async fn preview_listing(&self, page_number: usize, preview_ref: PreviewRef) -> Result<Reply> {
        let repository = self.repository.as_ref();
        let query = listing_query(self.page_size, Some(preview_ref));
        let feed = PostFeed::load_first_page(repository, &query).await?;

        for _ in 1..page_number {
            match feed.load_more(repository).await? {
                LoadOutcome::Loaded { added: 0 } | LoadOutcome::Exhausted => break,
                LoadOutcome::Loaded { .. } => {}
            }
        }

        let state = feed.into_state();
        let load_more_href = state
            .has_more_pages()
            .then(|| home_page_href(page_number + 1));
        let html = self.renderer.render_home(
            &state,
            ListingContext {
                load_more_href: load_more_href.as_deref(),
                preview: true,
            },
        )?;
        Ok(Reply::Html {
            status: 200,
            body: html.into_string(),
        })
    }

    /// Writes a freshly fetched post next to the built pages.
    fn persist(&self, page: &PostPage) -> Result<()> {
        let html = self.renderer.render_post(page)?;
        write_file(&post_path(&self.output_dir, &page.detail.uid), html.as_str())?;
        Ok(())
    }

    fn render_ready(&self, page: &PostPage) -> Result<Reply> {
        let html = self.renderer.render_post(page)?;
        Ok(Reply::Html {
            status: 200,
            body: html.into_string(),
        })
    }
}

// ---------------------------------------------------------------------------
// tiny_http bridge
// ---------------------------------------------------------------------------

fn handle_request(runtime: &Handle, site: &Arc<SiteServer>, request: Request) -> Result<()> {
    let incoming = IncomingRequest::from_tiny_http(&request);
    log::debug!("{} {}", incoming.method, incoming.url);

    let reply = runtime
        .block_on(site.route(&incoming))
        .unwrap_or_else(|e| {
            log::error!("Failed to answer {}: {}", incoming.url, e);
            Reply::Html {
                status: 500,
                body: "500 Internal Server Error".to_string(),
            }
        });

    respond(request, reply)
}

fn respond(request: Request, reply: Reply) -> Result<()> {
    let response = match reply {
        Reply::File(path) => {
            let content = std::fs::read(&path)?;
            Response::from_data(content).with_header(header("Content-Type", guess_content_type(&path))?)
        }
        Reply::Html { status, body } => Response::from_string(body)
            .with_status_code(StatusCode(status))
            .with_header(header("Content-Type", "text/html; charset=utf-8")?),
        Reply::Redirect(redirect) => redirect_response(&redirect)?,
        Reply::NotFound => Response::from_string("404 Not Found")
            .with_status_code(StatusCode(404))
            .with_header(header("Content-Type", "text/plain")?),
    };

    request.respond(response)?;
    Ok(())
}

fn redirect_response(redirect: &Redirect) -> Result<Response<Cursor<Vec<u8>>>> {
    let mut response = Response::from_data(Vec::new())
        .with_status_code(StatusCode(redirect.status))
        .with_header(header("Location", &redirect.location)?);

    if let Some(cookie) = &redirect.set_cookie {
        response = response.with_header(header("Set-Cookie", cookie)?);
    }

    Ok(response)
}

fn header(name: &str, value: &str) -> Result<Header> {
    Header::from_bytes(name, value)
        .map_err(|()| AppError::Server(format!("Invalid header {}: {}", name, value)))
}

/// Guess MIME content type from file extension.
fn guess_content_type(path: &Path) -> &'static str {
    match path.extension().and_then(|e| e.to_str()) {
        Some("html" | "htm") => "text/html; charset=utf-8",
        Some("css") => "text/css; charset=utf-8",
        Some("js") => "application/javascript; charset=utf-8",
        Some("json") => "application/json; charset=utf-8",
        Some("svg") => "image/svg+xml",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}
