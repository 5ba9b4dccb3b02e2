//! Presigned bulk-delete URLs
//!
//! Every request goes through the same pre-signing pipeline:
//! marshal the descriptor, normalize the body for its [`Operation`],
//! attach `content-md5`, then presign with SigV4. The returned
//! [`PresignedRequest`] keeps the exact payload bytes that were signed so the
//! submitter never has to serialize them a second time.

use crate::s3::error::{Result, S3Error};
use crate::s3::manifest::{frame_document, is_xml_char, write_delete_element, DeleteManifest, S3_XMLNS};
use crate::s3::signer::{content_md5, S3SignerV4, MAX_PRESIGN_EXPIRY};
use bytes::Bytes;
use chrono::{DateTime, Utc};
use hyper::Method;
use std::collections::BTreeMap;
use std::time::Duration;
use url::Url;

/// Validity window used for delete batches
pub const DEFAULT_PRESIGN_TTL: Duration = Duration::from_secs(15);

/// S3 limit on keys per DeleteObjects call
pub const MAX_DELETE_KEYS: usize = 1000;

/// Kind of request flowing through the presign pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    DeleteObjects,
    /// Bucket-level XML upload; its body is signed as given
    PutBucketTagging,
}

impl Operation {
    pub fn method(&self) -> Method {
        match self {
            Operation::DeleteObjects => Method::POST,
            Operation::PutBucketTagging => Method::PUT,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Operation::DeleteObjects => "DeleteObjects",
            Operation::PutBucketTagging => "PutBucketTagging",
        }
    }

    /// Bucket subresource the operation addresses
    fn subresource(&self) -> &'static str {
        match self {
            Operation::DeleteObjects => "delete=",
            Operation::PutBucketTagging => "tagging=",
        }
    }

    /// Pre-signing body transform.
    ///
    /// DeleteObjects bodies are framed into the canonical delete document
    /// (declaration + element + `\n`); every other body passes through.
    pub fn normalize_body(&self, body: Bytes) -> Bytes {
        match self {
            Operation::DeleteObjects => frame_document(&body),
            Operation::PutBucketTagging => body,
        }
    }
}

/// One entry of a DeleteObjects request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectIdentifier {
    pub key: String,
}

/// Structured DeleteObjects request descriptor
#[derive(Debug, Clone)]
pub struct DeleteObjectsInput {
    pub bucket: String,
    pub objects: Vec<ObjectIdentifier>,
}

impl DeleteObjectsInput {
    pub fn new(bucket: &str, keys: &[String]) -> Self {
        Self {
            bucket: bucket.to_string(),
            objects: keys
                .iter()
                .map(|key| ObjectIdentifier { key: key.clone() })
                .collect(),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.objects.is_empty() {
            return Err(S3Error::EmptyKeySet);
        }
        if self.objects.len() > MAX_DELETE_KEYS {
            return Err(S3Error::TooManyKeys {
                count: self.objects.len(),
                max: MAX_DELETE_KEYS,
            });
        }
        // The escaper would substitute U+FFFD and S3 would look up another key
        if let Some(object) = self.objects.iter().find(|o| !o.key.chars().all(is_xml_char)) {
            return Err(S3Error::InvalidKey(object.key.clone()));
        }
        Ok(())
    }

    /// The `<Delete>` element as a storage SDK marshaler emits it (no declaration)
    fn marshal(&self) -> Bytes {
        let mut xml = String::with_capacity(self.objects.len() * 40 + 80);
        write_delete_element(&mut xml, S3_XMLNS, self.objects.iter().map(|o| o.key.as_str()));
        Bytes::from(xml)
    }
}

/// A request before signing
#[derive(Debug, Clone)]
pub struct OperationRequest {
    pub operation: Operation,
    pub bucket: String,
    pub body: Bytes,
}

impl OperationRequest {
    pub fn new(operation: Operation, bucket: &str, body: Bytes) -> Self {
        Self {
            operation,
            bucket: bucket.to_string(),
            body,
        }
    }

    pub fn delete_objects(input: &DeleteObjectsInput) -> Self {
        Self::new(Operation::DeleteObjects, &input.bucket, input.marshal())
    }
}

/// Output of the presign pipeline
#[derive(Debug, Clone)]
pub struct PresignedRequest {
    pub operation: Operation,
    pub method: Method,
    pub url: Url,
    /// Normalized body whose digest was signed
    pub payload: Bytes,
    /// Signed `content-md5` value, present when the payload is non-empty
    pub content_md5: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl PresignedRequest {
    /// The service rejects the URL once this returns true
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Turns requests into time-limited signed URLs
#[derive(Clone)]
pub struct Presigner {
    signer: S3SignerV4,
    endpoint: Url,
    force_path_style: bool,
}

impl Presigner {
    /// Create a presigner. Without an explicit endpoint the regional AWS
    /// endpoint for the signer's region is used.
    pub fn new(signer: S3SignerV4, endpoint: Option<&str>, force_path_style: bool) -> Result<Self> {
        let endpoint = match endpoint {
            Some(endpoint) => endpoint.to_string(),
            None => default_endpoint(signer.region()),
        };
        let endpoint = Url::parse(&endpoint)
            .map_err(|e| S3Error::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        if !matches!(endpoint.scheme(), "http" | "https") || endpoint.host_str().is_none() {
            return Err(S3Error::InvalidEndpoint(endpoint.to_string()));
        }

        Ok(Self {
            signer,
            endpoint,
            force_path_style,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Presign a DeleteObjects call for `keys` in `bucket`
    pub fn presign(&self, bucket: &str, keys: &[String], ttl: Duration) -> Result<PresignedRequest> {
        let input = DeleteObjectsInput::new(bucket, keys);
        input.validate()?;
        self.presign_request(OperationRequest::delete_objects(&input), ttl)
    }

    /// Presign a DeleteObjects call for every key of `manifest`
    pub fn presign_manifest(
        &self,
        bucket: &str,
        manifest: &DeleteManifest,
        ttl: Duration,
    ) -> Result<PresignedRequest> {
        self.presign(bucket, &manifest.keys(), ttl)
    }

    pub fn presign_request(&self, request: OperationRequest, ttl: Duration) -> Result<PresignedRequest> {
        self.presign_request_at(request, ttl, Utc::now())
    }

    /// Run the pre-signing pipeline with an explicit signing time
    pub fn presign_request_at(
        &self,
        request: OperationRequest,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<PresignedRequest> {
        if ttl.as_secs() == 0 || ttl > MAX_PRESIGN_EXPIRY {
            return Err(S3Error::InvalidTtl(ttl));
        }
        let credentials = self.signer.credentials();
        if credentials.access_key.is_empty() {
            return Err(S3Error::MissingCredentials("access key"));
        }
        if credentials.secret_key.is_empty() {
            return Err(S3Error::MissingCredentials("secret key"));
        }

        let url = self.request_url(&request)?;
        let payload = request.operation.normalize_body(request.body);

        let mut headers = BTreeMap::new();
        let md5_header = (!payload.is_empty()).then(|| content_md5(&payload));
        if let Some(md5) = &md5_header {
            headers.insert("content-md5".to_string(), md5.clone());
        }

        let method = request.operation.method();
        let url = self.signer.presign(method.as_str(), &url, &headers, ttl, now);
        let expires_at = now
            + chrono::Duration::from_std(ttl).map_err(|_| S3Error::InvalidTtl(ttl))?;

        tracing::debug!(
            operation = request.operation.name(),
            bucket = %request.bucket,
            payload_len = payload.len(),
            expires_at = %expires_at,
            "presigned_request"
        );

        Ok(PresignedRequest {
            operation: request.operation,
            method,
            url,
            payload,
            content_md5: md5_header,
            expires_at,
        })
    }

    /// Unsigned target URL for `request`, virtual-hosted unless path-style is forced
    fn request_url(&self, request: &OperationRequest) -> Result<Url> {
        if request.bucket.is_empty() {
            return Err(S3Error::InvalidEndpoint("bucket name is empty".to_string()));
        }

        let base_path = self.endpoint.path().trim_end_matches('/');

        let mut url = self.endpoint.clone();
        if self.force_path_style {
            url.set_path(&format!("{}/{}/", base_path, request.bucket));
        } else {
            let host = self.endpoint.host_str().unwrap_or_default();
            url.set_host(Some(&format!("{}.{}", request.bucket, host)))
                .map_err(|e| S3Error::InvalidEndpoint(format!("{}: {}", request.bucket, e)))?;
            url.set_path(&format!("{}/", base_path));
        }

        url.set_query(Some(request.operation.subresource()));
        Ok(url)
    }
}

/// Regional AWS endpoint
fn default_endpoint(region: &str) -> String {
    if region == "us-east-1" {
        "https://s3.amazonaws.com".to_string()
    } else {
        format!("https://s3.{}.amazonaws.com", region)
    }
}
