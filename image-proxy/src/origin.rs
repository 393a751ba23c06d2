//! Client for fetching source images from remote origins.
//!
//! One client lives for the whole process and is shared by every request;
//! it only pools connections and keeps no per-request state.

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderValue, StatusCode};

use crate::error::ProxyError;

#[derive(Debug, Clone)]
pub struct OriginClient {
    http: reqwest::Client,
    max_source_bytes: u64,
}

impl OriginClient {
    pub fn new(timeout: Duration, max_source_bytes: u64) -> reqwest::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("image-proxy/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { http, max_source_bytes })
    }

    /// Download `url`, forwarding the caller's `Authorization` header if present.
    ///
    /// A `401` from the origin comes back as [`ProxyError::OriginUnauthorized`]
    /// carrying the origin's body; any other non-success status is
    /// [`ProxyError::OriginRejected`]. Bodies over the configured size cap
    /// fail with [`ProxyError::SourceTooLarge`] without being fully read.
    pub async fn fetch(&self, url: &str, authorization: Option<&HeaderValue>) -> Result<Bytes, ProxyError> {
        let mut request = self.http.get(url);
        if let Some(token) = authorization {
            request = request.header(header::AUTHORIZATION, token.clone());
        }

        let mut response = request.send().await?;
        let status = response.status();

        if status == StatusCode::UNAUTHORIZED {
            let body = response.text().await?;
            return Err(ProxyError::OriginUnauthorized(body));
        }
        if !status.is_success() {
            return Err(ProxyError::OriginRejected(status));
        }

        let limit = self.max_source_bytes;
        if response.content_length().is_some_and(|len| len > limit) {
            return Err(ProxyError::SourceTooLarge { limit });
        }

        // Content-Length may be absent
        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if (body.len() + chunk.len()) as u64 > limit {
                return Err(ProxyError::SourceTooLarge { limit });
            }
            body.extend_from_slice(&chunk);
        }

        Ok(Bytes::from(body))
    }
}
