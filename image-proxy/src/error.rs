//! Request failures and their HTTP mapping

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;
use thumbnail_pipeline::ThumbnailError;

use crate::worker::JobLost;

#[derive(Debug, Error)]
pub enum ProxyError {
    #[error("LongSidePx size must be lower than {max} pixels: {requested}")]
    LongSideTooLarge { requested: i32, max: i32 },

    #[error("RemoteUrl header is not a valid URL string")]
    InvalidRemoteUrl,

    #[error("Remote image is larger than {limit} bytes")]
    SourceTooLarge { limit: u64 },

    #[error("Failed to fetch remote URL: {0}")]
    Fetch(#[from] reqwest::Error),

    /// The origin wants credentials; its body is relayed untouched
    #[error("{0}")]
    OriginUnauthorized(String),

    #[error("Call to remote URL responded with {0}")]
    OriginRejected(StatusCode),

    #[error(transparent)]
    Thumbnail(#[from] ThumbnailError),

    #[error(transparent)]
    Worker(#[from] JobLost),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::LongSideTooLarge { .. } | ProxyError::InvalidRemoteUrl => StatusCode::BAD_REQUEST,
            ProxyError::SourceTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::Fetch(e) if e.is_builder() => StatusCode::BAD_REQUEST,
            ProxyError::Fetch(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ProxyError::Fetch(_) => StatusCode::BAD_GATEWAY,
            ProxyError::OriginUnauthorized(_) => StatusCode::UNAUTHORIZED,
            ProxyError::OriginRejected(_) => StatusCode::BAD_REQUEST,
            ProxyError::Thumbnail(e) if e.is_client_error() => StatusCode::UNPROCESSABLE_ENTITY,
            ProxyError::Thumbnail(_) | ProxyError::Worker(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(%status, error = %self, "Error in image processing");
        } else {
            tracing::warn!(%status, error = %self, "Thumbnail request rejected");
        }
        (status, self.to_string()).into_response()
    }
}
