//! Error types for the wall and wish stores.
//!
//! Remote failures on `list`/`create` never reach callers (they fall back to
//! local storage), so most [`StoreError`] variants only surface from the
//! adapters themselves or from local persistence.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("message must be at least {min} characters")]
    MessageTooShort { min: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("local storage error: {0}")]
    Storage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend responded with {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response from backend")]
    InvalidResponse,

    #[error(transparent)]
    Upload(#[from] UploadError),
}

/// Failures of the image upload step. These are shown to the user verbatim.
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Backend is not configured (missing API_BASE_URL)")]
    BackendNotConfigured,

    #[error(
        "Cloudinary is not configured. Set CLOUDINARY_CLOUD_NAME and CLOUDINARY_UPLOAD_PRESET."
    )]
    CloudinaryNotConfigured,

    #[error("Upload failed ({status}). {body}")]
    Rejected { status: u16, body: String },

    #[error("Cloudinary upload failed ({status}). {body}")]
    CloudinaryRejected { status: u16, body: String },

    #[error("Upload failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Upload failed: unexpected response")]
    InvalidResponse,

    #[error("Could not read image: {0}")]
    Io(#[from] std::io::Error),
}
