use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// S3 profile: where to send the delete and how to sign it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    /// S3 endpoint URL (default: regional AWS endpoint)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// AWS access key ID
    pub access_key: String,

    /// AWS secret access key
    pub secret_key: String,

    /// Session token for temporary credentials
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_token: Option<String>,

    /// AWS region (default: us-east-1)
    #[serde(default = "default_region")]
    pub region: String,

    /// Target bucket (default: test-bucket)
    #[serde(default = "default_bucket")]
    pub bucket: String,

    /// Use `endpoint/bucket/` instead of `bucket.endpoint/`
    #[serde(default)]
    pub force_path_style: bool,

    /// Disable TLS certificate verification
    #[serde(default)]
    pub insecure_tls: bool,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_bucket() -> String {
    "test-bucket".to_string()
}

/// Shape of the delete batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteConfig {
    /// Number of keys in the manifest
    #[serde(default = "default_count")]
    pub count: usize,

    /// Prefix of the generated keys
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,

    /// Presigned URL validity in seconds
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,

    /// Submission timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout: u64,
}

fn default_count() -> usize {
    2
}

fn default_key_prefix() -> String {
    "key-".to_string()
}

fn default_ttl_secs() -> u64 {
    15
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for DeleteConfig {
    fn default() -> Self {
        Self {
            count: default_count(),
            key_prefix: default_key_prefix(),
            ttl_secs: default_ttl_secs(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Named profiles for different S3 targets
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,

    /// Profile used when none is named
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_profile: Option<String>,

    /// Delete batch settings
    #[serde(default)]
    pub delete: DeleteConfig,
}

impl Config {
    /// Create a new empty configuration
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
            default_profile: None,
            delete: DeleteConfig::default(),
        }
    }

    /// Get a profile by name, or the default profile if not specified
    pub fn get_profile(&self, name: Option<&str>) -> Option<&Profile> {
        if let Some(name) = name {
            self.profiles.get(name)
        } else if let Some(default) = &self.default_profile {
            self.profiles.get(default)
        } else {
            self.profiles.values().next()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

/// Load configuration from a YAML file
pub fn load_from_yaml<P: AsRef<Path>>(path: P) -> Result<Config> {
    let content = std::fs::read_to_string(path.as_ref())
        .context(format!("Failed to read config file: {:?}", path.as_ref()))?;

    let config: Config =
        serde_yaml::from_str(&content).context("Failed to parse YAML configuration")?;

    Ok(config)
}

/// Load configuration from environment variables
///
/// - AWS_ACCESS_KEY_ID / AWS_SECRET_ACCESS_KEY (required)
/// - AWS_SESSION_TOKEN (optional)
/// - AWS_REGION / AWS_DEFAULT_REGION (optional, defaults to us-east-1)
/// - S3_ENDPOINT, S3_BUCKET, S3_FORCE_PATH_STYLE, S3_INSECURE_TLS (optional)
/// - DELETE_COUNT, DELETE_KEY_PREFIX, DELETE_TTL_SECS, DELETE_REQUEST_TIMEOUT_SECS (optional)
pub fn load_from_env() -> Result<Config> {
    // Try to load .env file if it exists (don't fail if it doesn't)
    let _ = dotenvy::dotenv();

    let mut config = Config::new();

    let access_key = std::env::var("AWS_ACCESS_KEY_ID")
        .context("AWS_ACCESS_KEY_ID environment variable not set")?;
    let secret_key = std::env::var("AWS_SECRET_ACCESS_KEY")
        .context("AWS_SECRET_ACCESS_KEY environment variable not set")?;
    let session_token = std::env::var("AWS_SESSION_TOKEN").ok().filter(|t| !t.is_empty());

    let region = std::env::var("AWS_REGION")
        .or_else(|_| std::env::var("AWS_DEFAULT_REGION"))
        .unwrap_or_else(|_| default_region());

    let profile = Profile {
        endpoint: std::env::var("S3_ENDPOINT").ok().filter(|e| !e.is_empty()),
        access_key,
        secret_key,
        session_token,
        region,
        bucket: std::env::var("S3_BUCKET").unwrap_or_else(|_| default_bucket()),
        force_path_style: env_flag("S3_FORCE_PATH_STYLE"),
        insecure_tls: env_flag("S3_INSECURE_TLS"),
    };

    config.profiles.insert("default".to_string(), profile);
    config.default_profile = Some("default".to_string());

    if let Some(count) = env_parse("DELETE_COUNT")? {
        config.delete.count = count;
    }
    if let Ok(prefix) = std::env::var("DELETE_KEY_PREFIX") {
        config.delete.key_prefix = prefix;
    }
    if let Some(ttl) = env_parse("DELETE_TTL_SECS")? {
        config.delete.ttl_secs = ttl;
    }
    if let Some(timeout) = env_parse("DELETE_REQUEST_TIMEOUT_SECS")? {
        config.delete.request_timeout = timeout;
    }

    Ok(config)
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

fn env_parse<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map(Some)
            .context(format!("Invalid value for {}: {:?}", name, value)),
        Err(_) => Ok(None),
    }
}

/// Load configuration from file or environment
///
/// # Arguments
/// * `config_path` - Optional path to YAML config file
/// * `profile_name` - Optional profile name to use (only relevant for YAML configs)
pub fn load_config(config_path: Option<&str>, profile_name: Option<&str>) -> Result<Config> {
    if let Some(path) = config_path {
        let mut config = load_from_yaml(path)?;

        // If a specific profile is requested, make it the default
        if let Some(name) = profile_name {
            if !config.profiles.contains_key(name) {
                anyhow::bail!("Profile '{}' not found in config file", name);
            }
            config.default_profile = Some(name.to_string());
        }

        Ok(config)
    } else {
        load_from_env()
    }
}
