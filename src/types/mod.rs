use thiserror::Error;

mod domain_types;
mod ids;

pub use domain_types::*;
pub use ids::*;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("Invalid post UID: {uid} - {reason}")]
    InvalidUid { uid: String, reason: String },

    #[error("Invalid document type: {0}")]
    InvalidDocumentType(String),

    #[error("Invalid URL: {url} - {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Empty required field: {0}")]
    EmptyField(&'static str),

    #[error("Invalid access token: {reason}")]
    InvalidAccessToken { reason: String },

    #[error("Invalid preview ref: {0}")]
    InvalidPreviewRef(String),

    #[error("Invalid publication timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Value out of bounds: {value}, expected {min}..={max}")]
    OutOfBounds { value: u32, min: u32, max: u32 },
}
