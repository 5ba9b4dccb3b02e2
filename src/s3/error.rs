//! Error type shared by the presign and submit paths

use hyper::StatusCode;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while presigning or submitting a bulk delete
#[derive(Error, Debug)]
pub enum S3Error {
    #[error("delete request must name at least one key")]
    EmptyKeySet,

    #[error("cannot delete more than {max} objects at once (got {count})")]
    TooManyKeys { count: usize, max: usize },

    #[error("object key {0:?} contains a character XML cannot represent")]
    InvalidKey(String),

    #[error("invalid presign TTL {0:?} (must be between 1s and 7 days)")]
    InvalidTtl(Duration),

    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("missing credentials: {0}")]
    MissingCredentials(&'static str),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::http::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request timed out after {0:?}")]
    Timeout(Duration),

    #[error("delete rejected: status {status}, body: {body}")]
    Rejected { status: StatusCode, body: String },

    #[error("signed payload does not match manifest: {0}")]
    PayloadMismatch(String),

    #[error("XML parse error: {0}")]
    XmlParse(String),
}

impl From<quick_xml::Error> for S3Error {
    fn from(err: quick_xml::Error) -> Self {
        S3Error::XmlParse(err.to_string())
    }
}

impl From<hyper_util::client::legacy::Error> for S3Error {
    fn from(err: hyper_util::client::legacy::Error) -> Self {
        S3Error::Transport(format!("client error: {}", err))
    }
}

impl From<hyper::Error> for S3Error {
    fn from(err: hyper::Error) -> Self {
        S3Error::Transport(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, S3Error>;
