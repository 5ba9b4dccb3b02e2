use std::env;
use std::fs;
use tempfile::TempDir;

/// Test loading configuration from YAML file
#[test]
fn test_load_yaml_config() {
    let yaml = r#"
profiles:
  test:
    endpoint: http://127.0.0.1:9000
    access_key: AKIATEST
    secret_key: secrettest
    session_token: tokentest
    region: us-west-2
    bucket: scratch-bucket
    force_path_style: true

default_profile: test

delete:
  count: 25
  key_prefix: "batch/"
  ttl_secs: 60
  request_timeout: 10
"#;

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, yaml).unwrap();

    let config = s3_presigned_delete::config::load_from_yaml(&config_path).unwrap();

    assert_eq!(config.profiles.len(), 1);
    let profile = config.get_profile(None).unwrap();
    assert_eq!(profile.endpoint.as_deref(), Some("http://127.0.0.1:9000"));
    assert_eq!(profile.access_key, "AKIATEST");
    assert_eq!(profile.secret_key, "secrettest");
    assert_eq!(profile.session_token.as_deref(), Some("tokentest"));
    assert_eq!(profile.region, "us-west-2");
    assert_eq!(profile.bucket, "scratch-bucket");
    assert!(profile.force_path_style);

    assert_eq!(config.delete.count, 25);
    assert_eq!(config.delete.key_prefix, "batch/");
    assert_eq!(config.delete.ttl_secs, 60);
    assert_eq!(config.delete.request_timeout, 10);
}

/// Environment loading; one test so the variables are not raced by parallel tests
#[test]
fn test_load_env_config() {
    let vars = [
        "AWS_ACCESS_KEY_ID",
        "AWS_SECRET_ACCESS_KEY",
        "AWS_SESSION_TOKEN",
        "AWS_REGION",
        "AWS_DEFAULT_REGION",
        "S3_ENDPOINT",
        "S3_BUCKET",
        "S3_FORCE_PATH_STYLE",
        "S3_INSECURE_TLS",
        "DELETE_COUNT",
        "DELETE_KEY_PREFIX",
        "DELETE_TTL_SECS",
        "DELETE_REQUEST_TIMEOUT_SECS",
    ];
    let saved: Vec<_> = vars.iter().map(|v| (*v, env::var(v).ok())).collect();
    for v in vars {
        env::remove_var(v);
    }

    // Missing credentials are a configuration error
    assert!(s3_presigned_delete::config::load_from_env().is_err());

    // Minimal: credentials only
    env::set_var("AWS_ACCESS_KEY_ID", "test_key");
    env::set_var("AWS_SECRET_ACCESS_KEY", "test_secret");
    let config = s3_presigned_delete::config::load_from_env().unwrap();
    let profile = config.get_profile(None).unwrap();
    assert_eq!(profile.access_key, "test_key");
    assert_eq!(profile.region, "us-east-1");
    assert_eq!(profile.bucket, "test-bucket");
    assert!(profile.endpoint.is_none());
    assert!(!profile.force_path_style);
    assert_eq!(config.delete.count, 2);
    assert_eq!(config.delete.ttl_secs, 15);
    assert_eq!(config.default_profile, Some("default".to_string()));

    // Everything set
    env::set_var("AWS_SESSION_TOKEN", "session");
    env::set_var("AWS_DEFAULT_REGION", "eu-west-1");
    env::set_var("S3_ENDPOINT", "http://localhost:9000");
    env::set_var("S3_BUCKET", "other-bucket");
    env::set_var("S3_FORCE_PATH_STYLE", "true");
    env::set_var("DELETE_COUNT", "7");
    env::set_var("DELETE_KEY_PREFIX", "tmp-");
    env::set_var("DELETE_TTL_SECS", "20");
    let config = s3_presigned_delete::config::load_from_env().unwrap();
    let profile = config.get_profile(None).unwrap();
    assert_eq!(profile.session_token.as_deref(), Some("session"));
    assert_eq!(profile.region, "eu-west-1");
    assert_eq!(profile.endpoint.as_deref(), Some("http://localhost:9000"));
    assert_eq!(profile.bucket, "other-bucket");
    assert!(profile.force_path_style);
    assert_eq!(config.delete.count, 7);
    assert_eq!(config.delete.key_prefix, "tmp-");
    assert_eq!(config.delete.ttl_secs, 20);

    // AWS_REGION wins over AWS_DEFAULT_REGION
    env::set_var("AWS_REGION", "ap-south-1");
    let config = s3_presigned_delete::config::load_from_env().unwrap();
    assert_eq!(config.get_profile(None).unwrap().region, "ap-south-1");

    // Unparseable numbers are rejected
    env::set_var("DELETE_COUNT", "many");
    assert!(s3_presigned_delete::config::load_from_env().is_err());

    for (key, value) in saved {
        cleanup_env(key, value);
    }
}

/// Test load_config with a named profile
#[test]
fn test_load_config_selects_profile() {
    let yaml = r#"
profiles:
  prod:
    access_key: prod_key
    secret_key: prod_secret
  dev:
    access_key: dev_key
    secret_key: dev_secret
    endpoint: http://127.0.0.1:9000

default_profile: prod
"#;

    let temp_dir = TempDir::new().unwrap();
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, yaml).unwrap();
    let path = config_path.to_str().unwrap();

    let config = s3_presigned_delete::config::load_config(Some(path), None).unwrap();
    assert_eq!(config.get_profile(None).unwrap().access_key, "prod_key");

    let config = s3_presigned_delete::config::load_config(Some(path), Some("dev")).unwrap();
    assert_eq!(config.get_profile(None).unwrap().access_key, "dev_key");

    assert!(s3_presigned_delete::config::load_config(Some(path), Some("missing")).is_err());
}

#[test]
fn test_missing_config_file() {
    let temp_dir = TempDir::new().unwrap();
    let missing = temp_dir.path().join("nope.yaml");
    assert!(s3_presigned_delete::config::load_from_yaml(&missing).is_err());
}

/// Helper function to cleanup environment variables
fn cleanup_env(key: &str, orig_val: Option<String>) {
    match orig_val {
        Some(val) => env::set_var(key, val),
        None => env::remove_var(key),
    }
}
