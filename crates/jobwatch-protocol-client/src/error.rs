use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProtocolClientError {
    #[error("invalid gateway url: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("invalid path segment {0:?}")]
    InvalidSegment(String),
    #[error("gateway request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gateway answered {status} for {url}: {body}")]
    Gateway {
        status: StatusCode,
        url: String,
        body: String,
    },
    #[error("undecodable gateway reply: {0}")]
    Deserialize(#[from] serde_json::Error),
}
