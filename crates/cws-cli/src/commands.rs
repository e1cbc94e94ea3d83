use anyhow::{Context, Result};
use cws_core::{PublishConfig, ResolverConfig, Settings};
use cws_store::{Publisher, ReqwestTransport, Transport};
use tracing::{info, instrument};

use crate::{BuildStoreConfigsArgs, UploadArgs};

/// Runs the `upload` command against the live store.
pub fn upload(settings: &Settings, args: &UploadArgs) -> Result<()> {
    let transport = ReqwestTransport::new().context("failed to build HTTP client")?;
    upload_with(settings, args, transport)
}

#[instrument(skip_all, fields(zip_path = %args.zip_path.display(), publish = args.publish))]
fn upload_with<T: Transport>(settings: &Settings, args: &UploadArgs, transport: T) -> Result<()> {
    let cfg = PublishConfig::from_settings(
        settings,
        args.zip_path.clone(),
        args.publish,
        &args.target,
    )
    .context("invalid upload configuration")?;

    let outcome = Publisher::new(transport)
        .run(&cfg)
        .with_context(|| format!("failed to upload '{}'", cfg.zip_path.display()))?;

    info!(
        item = %outcome.upload.id,
        upload_state = %outcome.upload.upload_state,
        published = outcome.publish.is_some(),
        "upload complete"
    );
    Ok(())
}

/// Runs the `build-store-configs` command.
#[instrument(skip_all)]
pub fn build_store_configs(args: &BuildStoreConfigsArgs) -> Result<()> {
    let cfg = ResolverConfig::new(args.src.clone(), args.dest.clone())
        .context("invalid build-store-configs arguments")?;

    let report = cws_resolver::resolve(&cfg).with_context(|| {
        format!(
            "failed to build store configs from '{}'",
            cfg.source_dir.display()
        )
    })?;

    info!(
        manifests = report.manifests,
        copied = report.copied.len(),
        skipped = report.skipped,
        "store configs built into '{}'",
        cfg.dest_dir.display()
    );
    Ok(())
}
