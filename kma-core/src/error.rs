//! Transport-level failures of the feed collaborator.
//!
//! Normalization never produces these: incomplete data is reported as
//! `None` by `normalize`, not as an error.

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    /// The HTTP request itself succeeded but returned a non-success status.
    #[error("{endpoint} request failed with status {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
        body: String,
    },

    /// The feed answered with a result code other than `00`.
    #[error("{endpoint} returned result code {code}: {message}")]
    ResultCode {
        endpoint: &'static str,
        code: String,
        message: String,
    },

    /// Success header without a body.
    #[error("{endpoint} response contained no body")]
    MissingBody { endpoint: &'static str },
}

impl FeedError {
    /// True when retrying with the same parameters cannot help.
    pub fn is_permanent(&self) -> bool {
        match self {
            FeedError::Status { status, .. } => status.is_client_error(),
            FeedError::ResultCode { code, .. } => {
                // 30: unregistered key, 31: expired key, 32: unregistered IP
                matches!(code.as_str(), "30" | "31" | "32")
            }
            FeedError::MissingBody { .. } => false,
        }
    }
}
