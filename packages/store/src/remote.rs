//! HTTP-backed wall backend.
//!
//! Talks to the family API:
//!
//! - `GET  {base}/api/wall?limit=N`
//! - `POST {base}/api/wall` with `{author, message, images}`
//! - `POST {base}/api/wall/{id}/flower`
//!
//! Responses are normalized with [`normalize_entry`]; malformed records in a
//! listing are dropped individually.

use reqwest::header::ACCEPT;
use reqwest::{Client, RequestBuilder, Url};
use serde_json::Value;

use crate::backend::WallBackend;
use crate::error::StoreError;
use crate::models::{NewWallEntry, WallEntry};
use crate::normalize::normalize_entry;

#[derive(Clone, Debug)]
pub struct RemoteWall {
    client: Client,
    base: Url,
}

impl RemoteWall {
    pub fn new(base: Url) -> Self {
        Self::with_client(Client::new(), base)
    }

    pub fn with_client(client: Client, base: Url) -> Self {
        Self { client, base }
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `{base}/seg/seg/...`, each segment percent-encoded.
    pub(crate) fn endpoint(base: &Url, segments: &[&str]) -> Result<Url, StoreError> {
        let mut url = base.clone();
        url.path_segments_mut()
            .map_err(|_| StoreError::Config(format!("{base} cannot be used as an API base")))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, request: RequestBuilder) -> Result<Value, StoreError> {
        let response = request.header(ACCEPT, "application/json").send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json::<Value>().await?)
    }
}

impl WallBackend for RemoteWall {
    async fn list(&self, limit: usize) -> Result<Vec<WallEntry>, StoreError> {
        let mut url = Self::endpoint(&self.base, &["api", "wall"])?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        tracing::debug!(%url, "Listing wall entries");

        let data = self.send(self.client.get(url)).await?;
        let Value::Array(items) = data else {
            tracing::warn!("Wall listing was not an array");
            return Ok(Vec::new());
        };

        let total = items.len();
        let entries: Vec<WallEntry> = items.iter().filter_map(normalize_entry).collect();
        if entries.len() < total {
            tracing::debug!(dropped = total - entries.len(), "Dropped malformed wall records");
        }
        Ok(entries)
    }

    async fn create(&self, input: &NewWallEntry) -> Result<WallEntry, StoreError> {
        let url = Self::endpoint(&self.base, &["api", "wall"])?;
        tracing::debug!(%url, "Posting wall entry");

        let created = self.send(self.client.post(url).json(input)).await?;
        normalize_entry(&created).ok_or(StoreError::InvalidResponse)
    }

    async fn add_flower(&self, id: &str) -> Result<Option<WallEntry>, StoreError> {
        let url = Self::endpoint(&self.base, &["api", "wall", id, "flower"])?;
        tracing::debug!(%url, "Adding flower");

        let updated = self.send(self.client.post(url)).await?;
        Ok(normalize_entry(&updated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base(s: &str) -> Url {
        Url::parse(s).unwrap()
    }

    #[test]
    fn test_endpoint_joins_segments() {
        let url = RemoteWall::endpoint(&base("https://memorial.example.org"), &["api", "wall"]).unwrap();
        assert_eq!(url.as_str(), "https://memorial.example.org/api/wall");
    }

    #[test]
    fn test_endpoint_keeps_base_path() {
        let url = RemoteWall::endpoint(&base("https://example.org/family"), &["api", "wall"]).unwrap();
        assert_eq!(url.as_str(), "https://example.org/family/api/wall");

        let url = RemoteWall::endpoint(&base("https://example.org/family/"), &["api", "wall"]).unwrap();
        assert_eq!(url.as_str(), "https://example.org/family/api/wall");
    }

    #[test]
    fn test_endpoint_encodes_ids() {
        let url = RemoteWall::endpoint(
            &base("https://memorial.example.org"),
            &["api", "wall", "a/b c", "flower"],
        )
        .unwrap();
        assert_eq!(
            url.as_str(),
            "https://memorial.example.org/api/wall/a%2Fb%20c/flower"
        );
    }
}
