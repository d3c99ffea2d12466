// src/api/parser.rs
//! Turns raw HTTP responses into wire types or typed API errors.

use super::client::ApiResponse;
use super::responses::{ApiInfo, PrismicErrorBody, SearchResponse};
use crate::constants::ERROR_BODY_PREVIEW_LENGTH;
use crate::error::{AppError, PrismicErrorCode};
use reqwest::StatusCode;

/// Parse any Prismic API response
pub fn parse_api_response<T>(result: ApiResponse<String>) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned,
{
    if result.status.is_success() {
        parse_success(&result.data, &result.url)
    } else {
        parse_error(&result.data, result.status, &result.url)
    }
}

fn parse_success<T>(body: &str, url: &str) -> Result<T, AppError>
where
    T: serde::de::DeserializeOwned,
{
    serde_json::from_str(body).map_err(|e| {
        log::error!("Failed to parse response from {}: {}", url, e);
        AppError::MalformedResponse(format!("{} (body: {})", e, preview_body(body)))
    })
}

fn parse_error<T>(body: &str, status: StatusCode, url: &str) -> Result<T, AppError> {
    if let Ok(error) = serde_json::from_str::<PrismicErrorBody>(body) {
        if let Some(error_type) = error.error_type.as_deref() {
            return Err(AppError::PrismicService {
                code: PrismicErrorCode::from_api_response(error_type),
                message: error
                    .description()
                    .unwrap_or("no message")
                    .to_string(),
                status,
            });
        }
        if let Some(description) = error.description() {
            return Err(AppError::PrismicService {
                code: PrismicErrorCode::from_http_status(status.as_u16()),
                message: description.to_string(),
                status,
            });
        }
    }

    Err(AppError::PrismicService {
        code: PrismicErrorCode::from_http_status(status.as_u16()),
        message: format!("HTTP {} from {}", status, url),
        status,
    })
}

fn preview_body(body: &str) -> String {
    if body.len() > ERROR_BODY_PREVIEW_LENGTH {
        let cut = (0..=ERROR_BODY_PREVIEW_LENGTH)
            .rev()
            .find(|i| body.is_char_boundary(*i))
            .unwrap_or(0);
        format!("{}...", &body[..cut])
    } else {
        body.to_string()
    }
}

/// Parse a documents search response
pub fn parse_search_response(result: ApiResponse<String>) -> Result<SearchResponse, AppError> {
    parse_api_response(result)
}

/// Parse the repository descriptor
pub fn parse_api_info(result: ApiResponse<String>) -> Result<ApiInfo, AppError> {
    parse_api_response(result)
}
