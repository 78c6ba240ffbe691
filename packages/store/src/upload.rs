//! # Image uploads for wall posts
//!
//! Images are uploaded before the entry is created, and the resulting
//! [`WallImage`] references are attached to the submission. Two routes exist:
//!
//! 1. **Backend** (preferred): `POST {base}/api/uploads/wall-image` with a
//!    multipart `file` field, answered with `{url, publicId?, width?, height?}`.
//! 2. **Cloudinary unsigned upload** (fallback): only used when a cloud name and
//!    unsigned preset are explicitly configured. Answered with
//!    `{secure_url, public_id?, width?, height?}`.
//!
//! Unlike text posts, upload failures are returned to the caller: posting an
//! image is an explicit action and the user has to see why it failed.

use reqwest::multipart::{Form, Part};
use reqwest::{Client, Url};
use serde::Deserialize;

use crate::config::{CloudinaryConfig, StoreConfig};
use crate::error::{StoreError, UploadError};
use crate::models::WallImage;
use crate::remote::RemoteWall;

/// A file picked for upload.
#[derive(Clone, Debug, PartialEq)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(file_name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Read a file from disk, guessing its content type from the extension.
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_path(path: &std::path::Path) -> Result<Self, UploadError> {
        let bytes = std::fs::read(path)?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let content_type = content_type_for(&file_name).to_string();
        Ok(Self {
            file_name,
            content_type,
            bytes,
        })
    }

    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    fn part(&self) -> Result<Part, reqwest::Error> {
        Part::bytes(self.bytes.clone())
            .file_name(self.file_name.clone())
            .mime_str(&self.content_type)
    }
}

/// Content type for the image extensions the wall accepts.
pub fn content_type_for(file_name: &str) -> &'static str {
    let ext = file_name
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        _ => "application/octet-stream",
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct BackendUpload {
    url: String,
    public_id: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

#[derive(Deserialize)]
struct CloudinaryUpload {
    secure_url: String,
    public_id: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
}

/// Uploads wall images through the backend, falling back to Cloudinary.
#[derive(Clone, Debug)]
pub struct Uploader {
    client: Client,
    api_base: Option<Url>,
    cloudinary: Option<CloudinaryConfig>,
}

impl Uploader {
    pub fn new(api_base: Option<Url>, cloudinary: Option<CloudinaryConfig>) -> Self {
        Self {
            client: Client::new(),
            api_base,
            cloudinary,
        }
    }

    pub fn from_config(config: &StoreConfig) -> Result<Self, StoreError> {
        Ok(Self::new(config.api_base()?, config.cloudinary.clone()))
    }

    /// Upload one file through the backend.
    pub async fn upload(&self, file: &UploadFile) -> Result<WallImage, UploadError> {
        let base = self
            .api_base
            .as_ref()
            .ok_or(UploadError::BackendNotConfigured)?;
        let url = RemoteWall::endpoint(base, &["api", "uploads", "wall-image"])
            .map_err(|_| UploadError::BackendNotConfigured)?;

        let form = Form::new().part("file", file.part()?);
        let response = self.client.post(url).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let uploaded: BackendUpload = response
            .json()
            .await
            .map_err(|_| UploadError::InvalidResponse)?;
        Ok(WallImage {
            url: uploaded.url,
            public_id: uploaded.public_id,
            width: uploaded.width,
            height: uploaded.height,
        })
    }

    /// Upload one file directly to Cloudinary with the unsigned preset.
    pub async fn upload_to_cloudinary(&self, file: &UploadFile) -> Result<WallImage, UploadError> {
        let cloudinary = self
            .cloudinary
            .as_ref()
            .ok_or(UploadError::CloudinaryNotConfigured)?;

        let form = Form::new()
            .part("file", file.part()?)
            .text("upload_preset", cloudinary.upload_preset.clone());
        let response = self
            .client
            .post(cloudinary.upload_url())
            .multipart(form)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(UploadError::CloudinaryRejected {
                status: status.as_u16(),
                body,
            });
        }

        let uploaded: CloudinaryUpload = response
            .json()
            .await
            .map_err(|_| UploadError::InvalidResponse)?;
        Ok(WallImage {
            url: uploaded.secure_url,
            public_id: uploaded.public_id,
            width: uploaded.width,
            height: uploaded.height,
        })
    }

    /// Upload a batch in order. If the backend fails on any file and
    /// Cloudinary is configured, the whole batch is retried there.
    pub async fn upload_all(&self, files: &[UploadFile]) -> Result<Vec<WallImage>, UploadError> {
        if files.is_empty() {
            return Ok(Vec::new());
        }

        let backend_error = match self.upload_batch(files, false).await {
            Ok(images) => return Ok(images),
            Err(e) => e,
        };
        if self.cloudinary.is_none() {
            return Err(backend_error);
        }

        tracing::warn!(error = %backend_error, "Backend upload failed, using Cloudinary");
        self.upload_batch(files, true).await
    }

    async fn upload_batch(
        &self,
        files: &[UploadFile],
        cloudinary: bool,
    ) -> Result<Vec<WallImage>, UploadError> {
        let mut images = Vec::with_capacity(files.len());
        for file in files {
            let image = if cloudinary {
                self.upload_to_cloudinary(file).await?
            } else {
                self.upload(file).await?
            };
            images.push(image);
        }
        Ok(images)
    }
}
