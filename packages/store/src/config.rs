//! # Store configuration: `memorial.toml` and environment
//!
//! The store has one real switch: whether a remote API base URL is configured.
//! Without it the store runs in local-only mode permanently; with it the
//! store is remote-first and falls back to local storage on failure. The
//! optional Cloudinary section enables the direct-upload fallback for images.
//!
//! ## Structure
//!
//! ```toml
//! api_base_url = "https://memorial.example.org"   # omit for local-only
//!
//! [cloudinary]
//! cloud_name = "family"
//! upload_preset = "unsigned_wall"
//! ```
//!
//! ## Environment
//!
//! | Variable | Field |
//! |----------|-------|
//! | `API_BASE_URL` | `api_base_url` |
//! | `CLOUDINARY_CLOUD_NAME` | `cloudinary.cloud_name` |
//! | `CLOUDINARY_UPLOAD_PRESET` | `cloudinary.upload_preset` |
//!
//! Blank values count as unset, and Cloudinary is only enabled when both its
//! variables are present. [`StoreConfig::from_env`] also loads a `.env` file
//! on native targets.

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub const API_BASE_URL_VAR: &str = "API_BASE_URL";
pub const CLOUDINARY_CLOUD_NAME_VAR: &str = "CLOUDINARY_CLOUD_NAME";
pub const CLOUDINARY_UPLOAD_PRESET_VAR: &str = "CLOUDINARY_UPLOAD_PRESET";

const CLOUDINARY_API_HOST: &str = "https://api.cloudinary.com";

/// Top-level store configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Base address of the remote API. `None` means local-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cloudinary: Option<CloudinaryConfig>,
}

/// Unsigned direct-upload settings for Cloudinary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CloudinaryConfig {
    pub cloud_name: String,
    pub upload_preset: String,
    /// Overrides `https://api.cloudinary.com`.
    #[serde(default = "default_cloudinary_host")]
    pub api_host: String,
}

fn default_cloudinary_host() -> String {
    CLOUDINARY_API_HOST.to_string()
}

impl CloudinaryConfig {
    pub fn new(cloud_name: impl Into<String>, upload_preset: impl Into<String>) -> Self {
        Self {
            cloud_name: cloud_name.into(),
            upload_preset: upload_preset.into(),
            api_host: default_cloudinary_host(),
        }
    }

    pub fn upload_url(&self) -> String {
        format!(
            "{}/v1_1/{}/image/upload",
            self.api_host.trim_end_matches('/'),
            self.cloud_name
        )
    }
}

impl StoreConfig {
    /// A config with no remote backend.
    pub fn local_only() -> Self {
        Self::default()
    }

    /// Builder method to set the remote API base.
    pub fn with_api_base(mut self, base: &str) -> Self {
        self.api_base_url = non_blank(Some(base.to_string()));
        self
    }

    /// Builder method to enable the Cloudinary fallback.
    pub fn with_cloudinary(mut self, cloudinary: CloudinaryConfig) -> Self {
        self.cloudinary = Some(cloudinary);
        self
    }

    /// Read the configuration from process environment (and `.env`).
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build a configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let cloud_name = non_blank(lookup(CLOUDINARY_CLOUD_NAME_VAR));
        let upload_preset = non_blank(lookup(CLOUDINARY_UPLOAD_PRESET_VAR));

        Self {
            api_base_url: non_blank(lookup(API_BASE_URL_VAR)),
            cloudinary: match (cloud_name, upload_preset) {
                (Some(name), Some(preset)) => Some(CloudinaryConfig::new(name, preset)),
                _ => None,
            },
        }
    }

    /// The parsed API base, without a trailing slash, if one is configured.
    pub fn api_base(&self) -> Result<Option<Url>, StoreError> {
        let Some(raw) = non_blank(self.api_base_url.clone()) else {
            return Ok(None);
        };
        let trimmed = raw.trim_end_matches('/');
        Url::parse(trimmed)
            .map(Some)
            .map_err(|e| StoreError::Config(format!("{API_BASE_URL_VAR} {trimmed:?}: {e}")))
    }

    /// The well-known filename for the config file.
    pub fn filename() -> &'static str {
        "memorial.toml"
    }

    /// Parse from TOML string. Blank values count as absent, as they do in
    /// the environment.
    pub fn from_toml(s: &str) -> Result<Self, toml::de::Error> {
        let parsed: Self = toml::from_str(s)?;
        let cloudinary = parsed.cloudinary.and_then(|c| {
            let cloud_name = non_blank(Some(c.cloud_name))?;
            let upload_preset = non_blank(Some(c.upload_preset))?;
            Some(CloudinaryConfig {
                cloud_name,
                upload_preset,
                api_host: c.api_host,
            })
        });
        Ok(Self {
            api_base_url: non_blank(parsed.api_base_url),
            cloudinary,
        })
    }

    /// Serialize to TOML string.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
