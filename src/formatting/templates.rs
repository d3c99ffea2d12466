// src/formatting/templates.rs
//! Renders view-models into HTML pages with Handlebars.
//!
//! The default templates are compiled into the binary. A template directory
//! may override any of them by file name (`home.hbs`, `partials/document_head.hbs`,
//! ...); missing files fall back to the built-in version.

use super::dates::{format_date, format_optional_date, format_time};
use crate::constants::SITE_NAME;
use crate::error::AppError;
use crate::model::{AdjacentPostRef, PaginationState};
use crate::output::post_href;
use crate::post::PostPage;
use crate::types::RenderedPage;
use handlebars::Handlebars;
use serde_json::{json, Value};
use std::path::Path;

const HOME_TEMPLATE: &str = "home";
const POST_TEMPLATE: &str = "post";
const FALLBACK_TEMPLATE: &str = "fallback";

/// Seconds between reloads of the fallback page while a post loads.
const FALLBACK_REFRESH_SECS: u32 = 1;

/// (name, file relative to the template directory, built-in source)
const BUILTIN_TEMPLATES: [(&str, &str, &str); 3] = [
    (HOME_TEMPLATE, "home.hbs", include_str!("../../templates/home.hbs")),
    (POST_TEMPLATE, "post.hbs", include_str!("../../templates/post.hbs")),
    (
        FALLBACK_TEMPLATE,
        "fallback.hbs",
        include_str!("../../templates/fallback.hbs"),
    ),
];

const BUILTIN_PARTIALS: [(&str, &str, &str); 4] = [
    (
        "document_head",
        "partials/document_head.hbs",
        include_str!("../../templates/partials/document_head.hbs"),
    ),
    (
        "document_foot",
        "partials/document_foot.hbs",
        include_str!("../../templates/partials/document_foot.hbs"),
    ),
    (
        "post_navigator",
        "partials/post_navigator.hbs",
        include_str!("../../templates/partials/post_navigator.hbs"),
    ),
    (
        "preview_button",
        "partials/preview_button.hbs",
        include_str!("../../templates/partials/preview_button.hbs"),
    ),
];

/// Extra context for rendering one listing page.
#[derive(Debug, Clone, Copy)]
pub struct ListingContext<'a> {
    /// URL of the next listing page, when there is one.
    pub load_more_href: Option<&'a str>,
    pub preview: bool,
}

/// The site's page renderer.
pub struct SiteRenderer {
    handlebars: Handlebars<'static>,
}

impl SiteRenderer {
    /// A renderer using only the built-in templates.
    pub fn builtin() -> Result<Self, AppError> {
        Self::load(None)
    }

    /// A renderer whose templates may be overridden from `template_dir`.
    pub fn load(template_dir: Option<&Path>) -> Result<Self, AppError> {
        let mut handlebars = Handlebars::new();

        for (name, file, builtin) in BUILTIN_PARTIALS {
            let source = load_source(template_dir, file, builtin)?;
            handlebars
                .register_partial(name, source)
                .map_err(|e| AppError::TemplateRenderError {
                    name: name.to_string(),
                    message: e.to_string(),
                })?;
        }

        for (name, file, builtin) in BUILTIN_TEMPLATES {
            let source = load_source(template_dir, file, builtin)?;
            handlebars
                .register_template_string(name, source)
                .map_err(|e| AppError::TemplateRenderError {
                    name: name.to_string(),
                    message: e.to_string(),
                })?;
        }

        Ok(Self { handlebars })
    }

    /// Renders one page of the post listing.
    pub fn render_home(
        &self,
        state: &PaginationState,
        context: ListingContext<'_>,
    ) -> Result<RenderedPage, AppError> {
        let posts: Vec<Value> = state
            .items
            .iter()
            .map(|post| {
                json!({
                    "uid": post.uid.as_str(),
                    "href": post_href(&post.uid),
                    "title": post.title,
                    "subtitle": post.subtitle,
                    "author": post.author,
                    "date": format_optional_date(post.first_publication_date.as_ref()),
                })
            })
            .collect();

        let data = json!({
            "site_name": SITE_NAME,
            "page_title": "Home",
            "posts": posts,
            "load_more_href": context.load_more_href,
            "preview": context.preview,
        });

        self.render(HOME_TEMPLATE, &data)
    }

    /// Renders a fully assembled post.
    pub fn render_post(&self, page: &PostPage) -> Result<RenderedPage, AppError> {
        let detail = &page.detail;

        let edited = detail.last_publication_date.as_ref().map(|date| {
            json!({
                "date": format_date(date),
                "time": format_time(date),
            })
        });

        let sections: Vec<Value> = detail
            .content_sections
            .iter()
            .map(|section| {
                json!({
                    "heading": section.heading,
                    "body": section.body_html,
                })
            })
            .collect();

        let data = json!({
            "site_name": SITE_NAME,
            "page_title": detail.title,
            "title": detail.title,
            "banner_url": detail.banner_url,
            "date": format_optional_date(detail.first_publication_date.as_ref()),
            "author": detail.author,
            "reading_time": format!("{} min", page.reading_time_minutes),
            "edited": edited,
            "sections": sections,
            "previous": detail.previous_post.as_ref().map(adjacent_link),
            "next": detail.next_post.as_ref().map(adjacent_link),
            "preview": page.preview,
        });

        self.render(POST_TEMPLATE, &data)
    }

    /// Renders the placeholder shown while a post is being fetched.
    ///
    /// With `refresh` set the page reloads itself, so a browser picks up the
    /// post once it is ready.
    pub fn render_fallback(&self, refresh: bool) -> Result<RenderedPage, AppError> {
        let data = json!({
            "site_name": SITE_NAME,
            "page_title": "Aguarde...",
            "refresh_secs": refresh.then_some(FALLBACK_REFRESH_SECS),
        });
        self.render(FALLBACK_TEMPLATE, &data)
    }

    fn render(&self, name: &str, data: &Value) -> Result<RenderedPage, AppError> {
        self.handlebars
            .render(name, data)
            .map(RenderedPage::new)
            .map_err(|e| AppError::TemplateRenderError {
                name: name.to_string(),
                message: e.to_string(),
            })
    }
}

fn adjacent_link(post: &AdjacentPostRef) -> Value {
    json!({
        "href": post_href(&post.uid),
        "title": post.title,
    })
}

fn load_source(
    template_dir: Option<&Path>,
    file: &str,
    builtin: &'static str,
) -> Result<String, AppError> {
    let Some(dir) = template_dir else {
        return Ok(builtin.to_string());
    };

    let path = dir.join(file);
    if !path.exists() {
        return Ok(builtin.to_string());
    }

    log::debug!("Using template override {}", path.display());
    std::fs::read_to_string(&path).map_err(|e| AppError::TemplateNotFound {
        path: path.display().to_string(),
        source: e,
    })
}
