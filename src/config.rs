// src/config.rs
use crate::constants::{HOME_PAGE_SIZE, MAX_PAGE_SIZE, REVALIDATE_SECS};
use crate::error::AppError;
use crate::types::{AccessToken, PreviewRef, ValidatedUrl, ValidationError};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

const ENDPOINT_VAR: &str = "PRISMIC_API_ENDPOINT";
const ACCESS_TOKEN_VAR: &str = "PRISMIC_ACCESS_TOKEN";

/// Parsed command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: SiteCommand,
}

#[derive(Subcommand, Debug)]
pub enum SiteCommand {
    /// Fetch all posts and write the static site
    Build(BuildArgs),
    /// Serve the built site, rendering posts on demand
    Serve(ServeArgs),
}

#[derive(Args, Debug, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub site: SiteArgs,
}

#[derive(Args, Debug, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub site: SiteArgs,

    /// Address to listen on
    #[arg(long, default_value = "127.0.0.1:3000")]
    pub addr: String,

    /// Serve the existing output directory without building first
    #[arg(long, default_value_t = false)]
    pub skip_build: bool,
}

/// Options shared by every command.
#[derive(Args, Debug, Clone)]
pub struct SiteArgs {
    /// Prismic API endpoint (defaults to $PRISMIC_API_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Read documents from a JSON file instead of the Prismic API
    #[arg(long)]
    pub fixture: Option<PathBuf>,

    /// Directory the site is written to
    #[arg(short, long, default_value = "public")]
    pub output_dir: PathBuf,

    /// Directory with template overrides (home.hbs, post.hbs, fallback.hbs, partials/)
    #[arg(short, long)]
    pub templates: Option<PathBuf>,

    /// Posts on the first listing page and on each page loaded after it
    #[arg(long, default_value_t = HOME_PAGE_SIZE)]
    pub page_size: u32,

    /// Build against a preview/release ref instead of published content
    #[arg(long)]
    pub preview_ref: Option<String>,

    /// Disable response caching (always fetch fresh data)
    #[arg(long, default_value_t = false)]
    pub no_cache: bool,

    /// Cache TTL in seconds (default: 7200 = 2 hours)
    #[arg(long, default_value_t = REVALIDATE_SECS)]
    pub cache_ttl: u64,
}

/// Where documents come from.
#[derive(Debug, Clone, PartialEq)]
pub enum ContentOrigin {
    Prismic {
        endpoint: ValidatedUrl,
        access_token: Option<AccessToken>,
    },
    Fixture(PathBuf),
}

/// Resolved site configuration, validated and ready to drive a build.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    pub origin: ContentOrigin,
    pub output_dir: PathBuf,
    pub template_dir: Option<PathBuf>,
    pub page_size: u32,
    pub preview_ref: Option<PreviewRef>,
    pub cache_enabled: bool,
    pub cache_ttl: u64,
}

impl SiteConfig {
    /// A configuration with default options for the given origin.
    pub fn new(origin: ContentOrigin, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            origin,
            output_dir: output_dir.into(),
            template_dir: None,
            page_size: HOME_PAGE_SIZE,
            preview_ref: None,
            cache_enabled: true,
            cache_ttl: REVALIDATE_SECS,
        }
    }

    /// Resolves the configuration from CLI arguments and the process environment.
    pub fn resolve(args: SiteArgs) -> Result<Self, AppError> {
        Self::resolve_with(args, |name| std::env::var(name).ok())
    }

    /// Resolves the configuration, reading environment variables through `env`.
    pub fn resolve_with(
        args: SiteArgs,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, AppError> {
        let origin = match args.fixture {
            Some(path) => ContentOrigin::Fixture(path),
            None => {
                let endpoint = args.endpoint.or_else(|| env(ENDPOINT_VAR)).ok_or_else(|| {
                    AppError::MissingConfiguration(format!(
                        "{} environment variable not set (or pass --endpoint / --fixture)",
                        ENDPOINT_VAR
                    ))
                })?;
                let access_token = env(ACCESS_TOKEN_VAR)
                    .filter(|token| !token.trim().is_empty())
                    .map(AccessToken::new)
                    .transpose()?;
                ContentOrigin::Prismic {
                    endpoint: ValidatedUrl::parse(&endpoint)?,
                    access_token,
                }
            }
        };

        if args.page_size == 0 || args.page_size > MAX_PAGE_SIZE {
            return Err(ValidationError::OutOfBounds {
                value: args.page_size,
                min: 1,
                max: MAX_PAGE_SIZE,
            }
            .into());
        }

        let preview_ref = args.preview_ref.map(PreviewRef::new).transpose()?;

        Ok(SiteConfig {
            origin,
            output_dir: args.output_dir,
            template_dir: args.templates,
            page_size: args.page_size,
            preview_ref,
            cache_enabled: !args.no_cache,
            cache_ttl: args.cache_ttl,
        })
    }

    pub fn is_preview(&self) -> bool {
        self.preview_ref.is_some()
    }
}

/// Configuration of the `serve` command.
#[derive(Debug, Clone)]
pub struct ServeConfig {
    pub site: SiteConfig,
    pub addr: String,
    pub build_first: bool,
}

impl ServeConfig {
    pub fn resolve(args: ServeArgs) -> Result<Self, AppError> {
        Ok(Self {
            site: SiteConfig::resolve(args.site)?,
            addr: args.addr,
            build_first: !args.skip_build,
        })
    }
}
