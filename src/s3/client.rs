//! Direct submitter: raw HTTP POST of a delete document to a presigned URL
//!
//! The request never goes through a signing client. The URL already carries
//! the signature; this side only has to send the exact signed bytes with a
//! matching `content-md5`.
//!
//! HTTP setup:
//! - HTTP/1.1 only
//! - TCP_NODELAY for low latency
//! - native-tls (OpenSSL) for TLS
//! - No retries: the URL is single-use and expires quickly

use crate::s3::error::{Result, S3Error};
use crate::s3::manifest::DeleteManifest;
use crate::s3::presign::PresignedRequest;
use crate::s3::signer::content_md5;
use crate::s3::types::{DeleteError, DeleteObjectsResponse, DeletedObject, SubmitOutcome};
use bytes::Bytes;
use chrono::Utc;
use http_body_util::{BodyExt, Full};
use hyper::{Method, Request};
use hyper_tls::HttpsConnector;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::TokioExecutor;
use native_tls::TlsConnector;
use quick_xml::events::Event;
use quick_xml::Reader;
use std::time::Duration;
use url::Url;

/// Default bound on a single submission
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// HTTP client that posts delete documents to presigned URLs
///
/// Clone is cheap - the underlying HTTP client uses Arc internally.
#[derive(Clone)]
pub struct DeleteClient {
    client: HyperClient<HttpsConnector<HttpConnector>, Full<Bytes>>,
    timeout: Duration,
}

impl DeleteClient {
    /// Create a client. `insecure_tls` disables certificate and hostname checks.
    pub fn new(insecure_tls: bool) -> Result<Self> {
        let mut http = HttpConnector::new();
        http.set_nodelay(true);
        http.enforce_http(false);
        http.set_connect_timeout(Some(Duration::from_secs(10)));

        let tls = if insecure_tls {
            tracing::warn!("INSECURE TLS MODE ENABLED: Certificate verification is disabled!");
            TlsConnector::builder()
                .danger_accept_invalid_certs(true)
                .danger_accept_invalid_hostnames(true)
                .build()
        } else {
            TlsConnector::new()
        };
        let tls =
            tls.map_err(|e| S3Error::Transport(format!("failed to build TLS connector: {}", e)))?;

        let https = HttpsConnector::from((http, tls.into()));
        let client = HyperClient::builder(TokioExecutor::new())
            .set_host(true)
            .build(https);

        Ok(Self {
            client,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        })
    }

    /// Set request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Serialize `manifest` and POST it to `url` with its digest and length
    pub async fn submit(&self, url: &Url, manifest: &DeleteManifest) -> Result<SubmitOutcome> {
        let document = manifest.document();
        let md5 = content_md5(&document);
        self.send(Method::POST, url, &md5, document).await
    }

    /// Send the exact payload that was signed by the presigner
    pub async fn submit_presigned(&self, presigned: &PresignedRequest) -> Result<SubmitOutcome> {
        if presigned.is_expired_at(Utc::now()) {
            tracing::warn!(
                expires_at = %presigned.expires_at,
                "presigned_url_expired_before_submit"
            );
        }
        let md5 = presigned
            .content_md5
            .clone()
            .unwrap_or_else(|| content_md5(&presigned.payload));
        self.send(presigned.method.clone(), &presigned.url, &md5, presigned.payload.clone())
            .await
    }

    async fn send(&self, method: Method, url: &Url, md5: &str, payload: Bytes) -> Result<SubmitOutcome> {
        let content_length = payload.len();
        let request = Request::builder()
            .method(method.clone())
            .uri(url.as_str())
            .header("content-type", "application/xml")
            .header("content-md5", md5)
            .header("content-length", content_length.to_string())
            .body(Full::new(payload))?;

        tracing::debug!(
            method = %method,
            host = url.host_str().unwrap_or_default(),
            content_length = content_length,
            content_md5 = %md5,
            "submitting_delete"
        );

        let exchange = async {
            let response = self.client.request(request).await?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.collect().await?.to_bytes();
            Ok::<_, S3Error>(SubmitOutcome { status, headers, body })
        };

        let outcome = tokio::time::timeout(self.timeout, exchange)
            .await
            .map_err(|_| S3Error::Timeout(self.timeout))??;

        tracing::debug!(status = %outcome.status, body_len = outcome.body.len(), "delete_response");
        Ok(outcome)
    }
}

impl SubmitOutcome {
    /// 200 becomes the parsed delete result; any other status is a rejection
    pub fn classify(self) -> Result<DeleteObjectsResponse> {
        if !self.is_success() {
            return Err(S3Error::Rejected {
                status: self.status,
                body: self.body_text(),
            });
        }
        parse_delete_response(&self.body)
    }
}

/// Parse a `<DeleteResult>` document (byte-slice tag matching)
fn parse_delete_response(xml_data: &[u8]) -> Result<DeleteObjectsResponse> {
    let mut reader = Reader::from_reader(xml_data);
    reader.config_mut().trim_text_start = true;
    reader.config_mut().trim_text_end = true;

    let mut response = DeleteObjectsResponse::new();
    let mut current_deleted: Option<DeletedObject> = None;
    let mut current_error: Option<DeleteError> = None;
    let mut current_text = String::with_capacity(256);

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => match e.local_name().as_ref() {
                b"Deleted" => {
                    current_deleted = Some(DeletedObject::new(String::new()));
                }
                b"Error" => {
                    current_error = Some(DeleteError {
                        key: String::new(),
                        code: String::new(),
                        message: String::new(),
                    });
                }
                _ => {}
            },
            Ok(Event::Text(e)) => {
                current_text.clear();
                current_text.push_str(&e.unescape()?);
            }
            Ok(Event::End(e)) => {
                match e.local_name().as_ref() {
                    b"Key" => {
                        if let Some(ref mut deleted) = current_deleted {
                            deleted.key = std::mem::take(&mut current_text);
                        } else if let Some(ref mut error) = current_error {
                            error.key = std::mem::take(&mut current_text);
                        }
                    }
                    b"VersionId" => {
                        if let Some(ref mut deleted) = current_deleted {
                            deleted.version_id = Some(std::mem::take(&mut current_text));
                        }
                    }
                    b"DeleteMarker" => {
                        if let Some(ref mut deleted) = current_deleted {
                            deleted.delete_marker = Some(current_text == "true");
                        }
                    }
                    b"DeleteMarkerVersionId" => {
                        if let Some(ref mut deleted) = current_deleted {
                            deleted.delete_marker_version_id =
                                Some(std::mem::take(&mut current_text));
                        }
                    }
                    b"Code" => {
                        if let Some(ref mut error) = current_error {
                            error.code = std::mem::take(&mut current_text);
                        }
                    }
                    b"Message" => {
                        if let Some(ref mut error) = current_error {
                            error.message = std::mem::take(&mut current_text);
                        }
                    }
                    b"Deleted" => {
                        if let Some(deleted) = current_deleted.take() {
                            response.deleted.push(deleted);
                        }
                    }
                    b"Error" => {
                        if let Some(error) = current_error.take() {
                            response.errors.push(error);
                        }
                    }
                    _ => {}
                }

                current_text.clear();
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(S3Error::XmlParse(e.to_string()));
            }
            _ => {}
        }
    }

    Ok(response)
}
