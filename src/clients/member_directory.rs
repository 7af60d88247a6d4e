//! HTTP client for the member directory

use async_trait::async_trait;
use reqwest::Url;
use std::time::Duration;

use crate::booking::verification::{DirectoryError, DirectoryResponse, MemberDirectory, MembershipId};

/// Member directory reached over `GET {base_url}/members/{id}`
#[derive(Debug, Clone)]
pub struct HttpMemberDirectory {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpMemberDirectory {
    pub fn new(base_url: impl AsRef<str>, timeout: Duration) -> Result<Self, DirectoryError> {
        let raw = base_url.as_ref();
        let base_url = Url::parse(raw).map_err(|_| DirectoryError::InvalidUrl(raw.to_string()))?;
        if base_url.cannot_be_a_base() {
            return Err(DirectoryError::InvalidUrl(raw.to_string()));
        }

        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, base_url })
    }

    /// The id is pushed as a single path segment, so it is escaped and cannot
    /// leave the `members` collection.
    fn member_url(&self, id: &MembershipId) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty().push("members").push(id.as_str());
        }
        url
    }
}

#[async_trait]
impl MemberDirectory for HttpMemberDirectory {
    async fn verify_member(&self, id: &MembershipId) -> Result<DirectoryResponse, DirectoryError> {
        let response = self.client.get(self.member_url(id)).send().await?;

        // The directory answers unknown members with 404 and a normal envelope
        let status = response.status();
        if status.is_server_error() {
            return Err(DirectoryError::Status(status.as_u16()));
        }

        let body: DirectoryResponse = response.json().await?;
        tracing::debug!("Directory answered {} for {}: success={}", status, id, body.success);
        Ok(body)
    }
}
