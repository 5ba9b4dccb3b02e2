use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use s3_presigned_delete::{config, Core};

#[derive(Parser)]
#[command(name = "s3-presigned-delete")]
#[command(version, about = "Delete a batch of S3 objects through a presigned URL", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(long)]
    config: Option<String>,

    /// Profile to use from config
    #[arg(long)]
    profile: Option<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Number of keys to delete (overrides config)
    #[arg(long)]
    count: Option<usize>,

    /// Presigned URL validity in seconds (overrides config)
    #[arg(long)]
    ttl: Option<u64>,

    /// Target bucket (overrides profile)
    #[arg(long)]
    bucket: Option<String>,

    /// Disable SSL certificate verification
    #[arg(long)]
    insecure: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| cli.log_level.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    // Single sequential request: current_thread is enough
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

async fn async_main(cli: Cli) -> Result<()> {
    let mut config = config::load_config(cli.config.as_deref(), cli.profile.as_deref())?;

    if let Some(count) = cli.count {
        config.delete.count = count;
    }
    if let Some(ttl) = cli.ttl {
        config.delete.ttl_secs = ttl;
    }
    if cli.bucket.is_some() || cli.insecure {
        let name = config
            .default_profile
            .clone()
            .or_else(|| config.profiles.keys().next().cloned())
            .context("No profile found in configuration")?;
        if let Some(profile) = config.profiles.get_mut(&name) {
            if let Some(bucket) = cli.bucket {
                profile.bucket = bucket;
            }
            profile.insecure_tls |= cli.insecure;
        }
        config.default_profile = Some(name);
    }

    let core = Core::new(config)?;

    let manifest = core.build_manifest();
    tracing::info!(bucket = %core.bucket(), keys = manifest.len(), "delete_manifest_built");

    let response = core
        .delete_manifest(&manifest)
        .await
        .context("Failed to DELETE objects using a pre-signed URL")?;

    tracing::info!(
        deleted = response.deleted.len(),
        errors = response.errors.len(),
        "delete_complete"
    );

    Ok(())
}
