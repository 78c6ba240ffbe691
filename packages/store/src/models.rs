//! # Domain models for the memorial wall and birthday wishes
//!
//! Types stored locally and exchanged with the remote API. All of them
//! serialise with camelCase keys (`createdAt`, `publicId`) so the JSON written
//! to local storage has the same shape as the backend's responses.
//!
//! ## Types
//!
//! | Struct | Represents |
//! |--------|-----------|
//! | [`WallEntry`] | A tribute on the memorial wall: author, message, creation time, flower count and attached images. |
//! | [`WallImage`] | A hosted image reference (URL plus optional provider metadata). |
//! | [`BirthdayWish`] | A wish left for one family member. |
//! | [`NewWallEntry`] / [`NewWish`] | Validated submissions. Constructing one trims the input, defaults a blank author to [`ANONYMOUS`] and rejects bodies shorter than [`MIN_MESSAGE_CHARS`]. |
//!
//! The store only accepts the validated submission types, so a too-short
//! message can never reach storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;
use crate::normalize::{self, created_at};

/// Author shown when none was given.
pub const ANONYMOUS: &str = "Anonymous";

/// Minimum trimmed length of a wall message or wish.
pub const MIN_MESSAGE_CHARS: usize = 2;

/// Images accepted per wall post.
pub const MAX_IMAGES: usize = 3;

/// A hosted image attached to a wall entry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallImage {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub public_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
}

impl WallImage {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            public_id: None,
            width: None,
            height: None,
        }
    }
}

/// A single tribute on the memorial wall.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WallEntry {
    pub id: String,
    pub author: String,
    pub message: String,
    #[serde(with = "created_at")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub flowers: u64,
    #[serde(default)]
    pub images: Vec<WallImage>,
}

/// A birthday wish left for one family member.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BirthdayWish {
    pub id: String,
    pub author: String,
    pub text: String,
    #[serde(with = "created_at")]
    pub created_at: DateTime<Utc>,
}

/// A validated wall submission. Serialises to the body of `POST /api/wall`.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct NewWallEntry {
    author: String,
    message: String,
    images: Vec<WallImage>,
}

impl NewWallEntry {
    pub fn new(author: &str, message: &str) -> Result<Self, StoreError> {
        Ok(Self {
            author: author_or_anonymous(author),
            message: validated_body(message)?,
            images: Vec::new(),
        })
    }

    /// Attach already-uploaded images.
    pub fn with_images(mut self, images: Vec<WallImage>) -> Self {
        self.images = images;
        self
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn images(&self) -> &[WallImage] {
        &self.images
    }

    /// Build the entry the local tier stores for this submission.
    pub(crate) fn into_local_entry(self) -> WallEntry {
        WallEntry {
            id: generate_id(),
            author: self.author,
            message: self.message,
            created_at: normalize::now(),
            flowers: 0,
            images: self.images,
        }
    }
}

/// A validated birthday wish submission.
#[derive(Clone, Debug, PartialEq)]
pub struct NewWish {
    author: String,
    text: String,
}

impl NewWish {
    pub fn new(author: &str, text: &str) -> Result<Self, StoreError> {
        Ok(Self {
            author: author_or_anonymous(author),
            text: validated_body(text)?,
        })
    }

    pub fn author(&self) -> &str {
        &self.author
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub(crate) fn into_wish(self) -> BirthdayWish {
        BirthdayWish {
            id: generate_id(),
            author: self.author,
            text: self.text,
            created_at: normalize::now(),
        }
    }
}

fn author_or_anonymous(author: &str) -> String {
    match author.trim() {
        "" => ANONYMOUS.to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn validated_body(body: &str) -> Result<String, StoreError> {
    let trimmed = body.trim();
    if trimmed.chars().count() < MIN_MESSAGE_CHARS {
        return Err(StoreError::MessageTooShort {
            min: MIN_MESSAGE_CHARS,
        });
    }
    Ok(trimmed.to_string())
}

/// Fresh client-side identifier for locally created records.
pub(crate) fn generate_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}
