// src/api/client.rs
//! Pure HTTP client wrapper for the Prismic REST API.
//!
//! This module provides a thin wrapper around reqwest for making
//! requests to a Prismic repository. It handles the access token and the
//! master ref lookup without parsing or business logic.
//!
//! The master ref changes whenever content is published, so a resolved ref
//! is only trusted for a while, and a search the API answers with "ref not
//! found" resolves it again and retries once.

use super::parser;
use super::query::DocumentQuery;
use super::responses::SearchResponse;
use crate::constants::MASTER_REF_TTL_SECS;
use crate::error::{AppError, PrismicErrorCode};
use crate::types::{AccessToken, ValidatedUrl};
use reqwest::{header, Client, Response};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use url::Url;

/// A master ref and when it was looked up.
#[derive(Debug, Clone)]
struct ResolvedRef {
    value: String,
    resolved_at: Instant,
}

/// A thin wrapper around reqwest Client for Prismic API requests.
pub struct PrismicHttpClient {
    client: Client,
    endpoint: ValidatedUrl,
    access_token: Option<AccessToken>,
    master_ref: Mutex<Option<ResolvedRef>>,
    ref_ttl: Duration,
}

impl PrismicHttpClient {
    /// Creates a new HTTP client for the repository at `endpoint`
    /// (e.g. `https://my-blog.cdn.prismic.io/api/v2`).
    pub fn new(endpoint: ValidatedUrl, access_token: Option<AccessToken>) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers())
            .build()?;
        Ok(Self::with_client(client, endpoint, access_token))
    }

    fn with_client(
        client: Client,
        endpoint: ValidatedUrl,
        access_token: Option<AccessToken>,
    ) -> Self {
        Self {
            client,
            endpoint,
            access_token,
            master_ref: Mutex::new(None),
            ref_ttl: Duration::from_secs(MASTER_REF_TTL_SECS),
        }
    }

    /// How long a resolved master ref is used before looking it up again.
    pub fn with_ref_ttl(mut self, ref_ttl: Duration) -> Self {
        self.ref_ttl = ref_ttl;
        self
    }

    fn create_headers() -> header::HeaderMap {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers
    }

    /// Makes a GET request, adding the access token when one is configured.
    pub async fn get(&self, mut url: Url) -> Result<Response, AppError> {
        if let Some(token) = &self.access_token {
            if !url.query_pairs().any(|(key, _)| key == "access_token") {
                url.query_pairs_mut()
                    .append_pair("access_token", token.as_str());
            }
        }

        log::debug!("GET {}", redact_token(&url));
        let response = self.client.get(url).send().await?;
        log::debug!("-> {}", response.status());

        Ok(response)
    }

    /// The ref of the currently published content.
    ///
    /// Looked up from the repository descriptor, then reused until it is
    /// older than the ref TTL.
    pub async fn master_ref(&self) -> Result<String, AppError> {
        let mut cached = self.master_ref.lock().await;
        if let Some(resolved) = cached.as_ref() {
            if resolved.resolved_at.elapsed() < self.ref_ttl {
                return Ok(resolved.value.clone());
            }
            log::debug!("Master ref {} is stale", resolved.value);
        }

        let value = self.fetch_master_ref().await?;
        *cached = Some(ResolvedRef {
            value: value.clone(),
            resolved_at: Instant::now(),
        });
        Ok(value)
    }

    async fn fetch_master_ref(&self) -> Result<String, AppError> {
        let response = self.get(self.endpoint.as_url().clone()).await?;
        let result = extract_response_text(response).await?;
        let info = parser::parse_api_info(result)?;
        let master = info.master_ref().ok_or_else(|| {
            AppError::MalformedResponse("Repository descriptor lists no master ref".to_string())
        })?;
        log::info!("Using master ref {}", master);
        Ok(master.to_string())
    }

    async fn forget_master_ref(&self) {
        self.master_ref.lock().await.take();
    }

    async fn search(&self, query: &DocumentQuery) -> Result<SearchResponse, AppError> {
        let master_ref = self.master_ref().await?;
        let mut url = self.search_url()?;
        query.apply_to(&mut url, &master_ref);

        let response = self.get(url).await?;
        let result = extract_response_text(response).await?;
        parser::parse_search_response(result)
    }

    /// The documents search URL for this repository.
    fn search_url(&self) -> Result<Url, AppError> {
        let base = self.endpoint.as_str().trim_end_matches('/');
        Url::parse(&format!("{}/documents/search", base))
            .map_err(|e| AppError::MissingConfiguration(format!("Invalid API endpoint: {}", e)))
    }
}

#[async_trait::async_trait]
impl super::ContentRepository for PrismicHttpClient {
    async fn query(&self, query: &DocumentQuery) -> Result<SearchResponse, AppError> {
        match self.search(query).await {
            Err(AppError::PrismicService {
                code: PrismicErrorCode::RefNotFound,
                ..
            }) if query.preview_ref.is_none() => {
                log::info!("Master ref was rejected; looking it up again");
                self.forget_master_ref().await;
                self.search(query).await
            }
            result => result,
        }
    }

    async fn follow_cursor(&self, cursor: &str) -> Result<SearchResponse, AppError> {
        let url = ValidatedUrl::parse(cursor)?;
        let response = self.get(url.as_url().clone()).await?;
        let result = extract_response_text(response).await?;
        parser::parse_search_response(result)
    }
}

/// Hides the access token when logging a URL.
fn redact_token(url: &Url) -> String {
    let mut shown = url.clone();
    let pairs: Vec<(String, String)> = url
        .query_pairs()
        .map(|(key, value)| {
            if key == "access_token" {
                (key.into_owned(), "***".to_string())
            } else {
                (key.into_owned(), value.into_owned())
            }
        })
        .collect();
    shown.query_pairs_mut().clear().extend_pairs(pairs);
    shown.to_string()
}

/// Result of an HTTP operation with response metadata.
#[derive(Debug)]
pub struct ApiResponse<T> {
    pub data: T,
    pub status: reqwest::StatusCode,
    pub url: String,
}

/// Extracts the response body as text with metadata.
pub async fn extract_response_text(response: Response) -> Result<ApiResponse<String>, AppError> {
    let status = response.status();
    let url = redact_token(response.url());
    let text = response.text().await?;

    Ok(ApiResponse {
        data: text,
        status,
        url,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ContentRepository;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use tiny_http::{Header, Response as HttpResponse, Server};

    const EMPTY_PAGE: &str = r#"{"page":1,"results_per_page":20,"results_size":0,"total_results_size":0,"total_pages":0,"next_page":null,"prev_page":null,"results":[]}"#;
    const REF_NOT_FOUND: &str = r#"{"type":"api_notfound_error","message":"Ref not found"}"#;

    /// A local stand-in for a Prismic repository.
    ///
    /// The descriptor hands out `published[n]` on its n-th lookup (the last
    /// one once they run out). Searches with a ref listed in `rejected`
    /// answer 404.
    struct LocalRepository {
        endpoint: ValidatedUrl,
        lookups: Arc<AtomicUsize>,
        searched_refs: Arc<parking_lot::Mutex<Vec<String>>>,
    }

    fn local_repository(published: &[&str], rejected: &[&str]) -> LocalRepository {
        let server = Server::http("127.0.0.1:0").unwrap();
        let addr = server.server_addr().to_ip().unwrap();
        let lookups = Arc::new(AtomicUsize::new(0));
        let searched_refs = Arc::new(parking_lot::Mutex::new(Vec::new()));

        let published: Vec<String> = published.iter().map(|r| r.to_string()).collect();
        let rejected: Vec<String> = rejected.iter().map(|r| r.to_string()).collect();
        let (hits, seen) = (Arc::clone(&lookups), Arc::clone(&searched_refs));
        std::thread::spawn(move || {
            for request in server.incoming_requests() {
                let url = Url::parse(&format!("http://{}{}", addr, request.url())).unwrap();
                let (status, body) = if url.path().ends_with("/documents/search") {
                    let content_ref = url
                        .query_pairs()
                        .find(|(key, _)| key == "ref")
                        .map(|(_, value)| value.into_owned())
                        .unwrap_or_default();
                    let status = if rejected.contains(&content_ref) { 404 } else { 200 };
                    seen.lock().push(content_ref);
                    (status, if status == 200 { EMPTY_PAGE } else { REF_NOT_FOUND }.to_string())
                } else {
                    let n = hits.fetch_add(1, Ordering::SeqCst);
                    let master = &published[n.min(published.len() - 1)];
                    let body = format!(
                        r#"{{"refs":[{{"id":"master","ref":"{}","label":"Master","isMasterRef":true}}]}}"#,
                        master
                    );
                    (200, body)
                };
                let response = HttpResponse::from_string(body)
                    .with_status_code(status)
                    .with_header(Header::from_bytes("Content-Type", "application/json").unwrap());
                let _ = request.respond(response);
            }
        });

        LocalRepository {
            endpoint: ValidatedUrl::parse(&format!("http://{}/api/v2", addr)).unwrap(),
            lookups,
            searched_refs,
        }
    }

    fn client_for(repository: &LocalRepository) -> PrismicHttpClient {
        let client = Client::builder().no_proxy().build().unwrap();
        PrismicHttpClient::with_client(client, repository.endpoint.clone(), None)
    }

    #[tokio::test]
    async fn test_master_ref_is_reused_while_fresh() {
        let repository = local_repository(&["first-ref", "second-ref"], &[]);
        let client = client_for(&repository);

        client.query(&DocumentQuery::posts()).await.unwrap();
        client.query(&DocumentQuery::posts()).await.unwrap();

        assert_eq!(repository.lookups.load(Ordering::SeqCst), 1);
        assert_eq!(*repository.searched_refs.lock(), ["first-ref", "first-ref"]);
    }

    #[tokio::test]
    async fn test_stale_master_ref_is_looked_up_again() {
        let repository = local_repository(&["first-ref", "second-ref"], &[]);
        let client = client_for(&repository).with_ref_ttl(Duration::ZERO);

        client.query(&DocumentQuery::posts()).await.unwrap();
        client.query(&DocumentQuery::posts()).await.unwrap();

        assert_eq!(repository.lookups.load(Ordering::SeqCst), 2);
        assert_eq!(*repository.searched_refs.lock(), ["first-ref", "second-ref"]);
    }

    #[tokio::test]
    async fn test_rejected_master_ref_is_replaced_and_retried() {
        let repository = local_repository(&["old-ref", "new-ref"], &["old-ref"]);
        let client = client_for(&repository);

        let response = client.query(&DocumentQuery::posts()).await.unwrap();

        assert!(response.results.is_empty());
        assert_eq!(repository.lookups.load(Ordering::SeqCst), 2);
        assert_eq!(*repository.searched_refs.lock(), ["old-ref", "new-ref"]);
        assert_eq!(client.master_ref().await.unwrap(), "new-ref");
    }

    #[test]
    fn test_redact_token_hides_secret() {
        let url = Url::parse(
            "https://blog.cdn.prismic.io/api/v2/documents/search?ref=abc&access_token=secret&page=2",
        )
        .unwrap();
        let shown = redact_token(&url);
        assert!(!shown.contains("secret"));
        assert!(shown.contains("page=2"));
    }

    #[test]
    fn test_search_url_is_derived_from_endpoint() {
        let endpoint = ValidatedUrl::parse("https://blog.cdn.prismic.io/api/v2/").unwrap();
        let client = PrismicHttpClient::new(endpoint, None).unwrap();
        assert_eq!(
            client.search_url().unwrap().as_str(),
            "https://blog.cdn.prismic.io/api/v2/documents/search"
        );
    }
}
