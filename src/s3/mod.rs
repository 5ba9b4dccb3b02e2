//! S3 bulk delete over presigned URLs
//!
//! This module provides:
//! - The delete manifest and its canonical XML document
//! - AWS Signature Version 4 query-string presigning
//! - A direct HTTP submitter for presigned DeleteObjects requests

pub mod client;
pub mod error;
pub mod manifest;
pub mod presign;
pub mod signer;
pub mod types;

// Re-export main types for convenience
pub use client::DeleteClient;
pub use error::{Result, S3Error};
pub use manifest::{DeleteManifest, ObjectRef};
pub use presign::{Operation, OperationRequest, PresignedRequest, Presigner, DEFAULT_PRESIGN_TTL};
pub use signer::{content_md5, Credentials, S3SignerV4};
pub use types::{DeleteError, DeleteObjectsResponse, DeletedObject, SubmitOutcome};
