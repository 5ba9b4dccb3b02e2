use crate::config::{Config, Profile};
use crate::s3::{
    Credentials, DeleteClient, DeleteManifest, DeleteObjectsResponse, PresignedRequest, Presigner,
    S3Error, S3SignerV4,
};
use anyhow::{Context, Result};
use std::sync::Arc;
use std::time::Duration;

/// Wires the presigner and the direct submitter for one profile
///
/// A run is strictly linear: build manifest, presign, submit, classify.
/// The first error ends it; nothing is retried.
#[derive(Clone)]
pub struct Core {
    pub config: Arc<Config>,
    profile: Profile,
    presigner: Presigner,
    client: DeleteClient,
}

impl Core {
    pub fn new(config: Config) -> Result<Self> {
        let config = Arc::new(config);

        let profile = config
            .get_profile(None)
            .ok_or_else(|| anyhow::anyhow!("No profile found in configuration"))?
            .clone();

        let signer = S3SignerV4::new(
            Credentials::new(
                profile.access_key.clone(),
                profile.secret_key.clone(),
                profile.session_token.clone(),
            ),
            Some(profile.region.clone()),
        );
        let presigner = Presigner::new(signer, profile.endpoint.as_deref(), profile.force_path_style)
            .context("Failed to set up presigner")?;

        let client = DeleteClient::new(profile.insecure_tls)
            .context("Failed to set up HTTP client")?
            .with_timeout(Duration::from_secs(config.delete.request_timeout));

        tracing::info!(
            endpoint = %presigner.endpoint(),
            bucket = %profile.bucket,
            region = %profile.region,
            path_style = profile.force_path_style,
            "core_initialized"
        );

        Ok(Self {
            config,
            profile,
            presigner,
            client,
        })
    }

    pub fn bucket(&self) -> &str {
        &self.profile.bucket
    }

    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.config.delete.ttl_secs)
    }

    /// Manifest described by the `delete` config section
    pub fn build_manifest(&self) -> DeleteManifest {
        DeleteManifest::build_with_prefix(&self.config.delete.key_prefix, self.config.delete.count)
    }

    /// Presign `manifest`, send the signed payload and classify the response
    pub async fn delete_manifest(
        &self,
        manifest: &DeleteManifest,
    ) -> std::result::Result<DeleteObjectsResponse, S3Error> {
        let presigned = self.presigner.presign_manifest(self.bucket(), manifest, self.ttl())?;
        tracing::info!(
            keys = manifest.len(),
            expires_at = %presigned.expires_at,
            "delete_presigned"
        );

        ensure_signed_payload(&presigned, manifest)?;

        let outcome = self.client.submit_presigned(&presigned).await?;
        tracing::info!(status = %outcome.status, "delete_submitted");

        let response = outcome.classify()?;
        for error in &response.errors {
            tracing::warn!(key = %error.key, code = %error.code, message = %error.message, "delete_key_failed");
        }
        Ok(response)
    }
}

/// The signed payload must carry exactly the manifest's keys, byte for byte
fn ensure_signed_payload(
    presigned: &PresignedRequest,
    manifest: &DeleteManifest,
) -> std::result::Result<(), S3Error> {
    let signed = DeleteManifest::parse(&presigned.payload)?;
    if signed.keys() != manifest.keys() {
        return Err(S3Error::PayloadMismatch(format!(
            "signed {} keys, manifest has {}",
            signed.len(),
            manifest.len()
        )));
    }
    if presigned.payload != manifest.document() {
        return Err(S3Error::PayloadMismatch(
            "signed document bytes differ from manifest document".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DeleteConfig;
    use crate::s3::DEFAULT_PRESIGN_TTL;

    fn test_config() -> Config {
        let mut config = Config::new();
        config.profiles.insert(
            "local".to_string(),
            Profile {
                endpoint: Some("http://127.0.0.1:9000".to_string()),
                access_key: "AKIDEXAMPLE".to_string(),
                secret_key: "secret".to_string(),
                session_token: None,
                region: "us-east-1".to_string(),
                bucket: "test-bucket".to_string(),
                force_path_style: true,
                insecure_tls: false,
            },
        );
        config.delete = DeleteConfig {
            count: 3,
            key_prefix: "k".to_string(),
            ..DeleteConfig::default()
        };
        config
    }

    fn presigner() -> Presigner {
        let signer = S3SignerV4::new(
            Credentials::new("AKIDEXAMPLE".to_string(), "secret".to_string(), None),
            None,
        );
        Presigner::new(signer, None, false).unwrap()
    }

    #[tokio::test]
    async fn test_core_uses_config() {
        let core = Core::new(test_config()).unwrap();
        assert_eq!(core.bucket(), "test-bucket");
        assert_eq!(core.ttl(), Duration::from_secs(15));
        assert_eq!(core.build_manifest().keys(), vec!["k0", "k1", "k2"]);
    }

    #[test]
    fn test_core_requires_profile() {
        assert!(Core::new(Config::new()).is_err());
    }

    #[test]
    fn test_signed_payload_matches_manifest() {
        let manifest = DeleteManifest::build(4);
        let presigned = presigner()
            .presign_manifest("b", &manifest, DEFAULT_PRESIGN_TTL)
            .unwrap();
        assert!(ensure_signed_payload(&presigned, &manifest).is_ok());
    }

    #[test]
    fn test_signed_payload_mismatch_is_detected() {
        let presigned = presigner()
            .presign_manifest("b", &DeleteManifest::build(2), DEFAULT_PRESIGN_TTL)
            .unwrap();

        let reordered = DeleteManifest::from_keys(["key-1", "key-0"]);
        assert!(matches!(
            ensure_signed_payload(&presigned, &reordered),
            Err(S3Error::PayloadMismatch(_))
        ));

        let longer = DeleteManifest::build(3);
        assert!(matches!(
            ensure_signed_payload(&presigned, &longer),
            Err(S3Error::PayloadMismatch(_))
        ));
    }
}
