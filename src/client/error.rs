//! Errors from talking to the job backend

use reqwest::StatusCode;
use thiserror::Error;

use crate::client::sse::SseError;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("invalid server URL {url:?}: {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success status; `message` is the response body
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },

    #[error("unexpected response from server: {0}")]
    InvalidResponse(String),

    #[error("invalid event payload: {0}")]
    InvalidEvent(String),

    #[error(transparent)]
    Stream(#[from] SseError),

    #[error("event stream closed before the job finished")]
    StreamClosed,

    #[error("no data from event stream for {0} seconds")]
    IdleTimeout(u64),
}

impl ClientError {
    /// HTTP status for rejected requests
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ClientError::Rejected { status, .. } => Some(*status),
            ClientError::Http(e) => e.status(),
            _ => None,
        }
    }
}
