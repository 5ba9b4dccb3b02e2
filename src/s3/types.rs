//! S3 types and response structures

use bytes::Bytes;
use hyper::header::HeaderMap;
use hyper::StatusCode;
use serde::{Deserialize, Serialize};

/// Raw response of a direct submission, before classification
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl SubmitOutcome {
    /// DeleteObjects answers exactly 200 on success
    pub fn is_success(&self) -> bool {
        self.status == StatusCode::OK
    }

    /// Response body as text, for diagnostics
    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).to_string()
    }
}

/// Response from DeleteObjects batch operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteObjectsResponse {
    /// List of successfully deleted objects
    pub deleted: Vec<DeletedObject>,
    /// List of errors
    pub errors: Vec<DeleteError>,
}

impl DeleteObjectsResponse {
    /// Create a new empty response
    pub fn new() -> Self {
        Self {
            deleted: Vec::new(),
            errors: Vec::new(),
        }
    }
}

impl Default for DeleteObjectsResponse {
    fn default() -> Self {
        Self::new()
    }
}

/// Deleted object information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeletedObject {
    /// Object key
    pub key: String,
    /// Version ID (optional)
    pub version_id: Option<String>,
    /// Delete marker (optional)
    pub delete_marker: Option<bool>,
    /// Delete marker version ID (optional)
    pub delete_marker_version_id: Option<String>,
}

impl DeletedObject {
    /// Create a new deleted object
    pub fn new(key: String) -> Self {
        Self {
            key,
            version_id: None,
            delete_marker: None,
            delete_marker_version_id: None,
        }
    }
}

/// Per-key failure reported inside a 200 DeleteObjects response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteError {
    /// Object key
    pub key: String,
    /// Error code
    pub code: String,
    /// Error message
    pub message: String,
}
