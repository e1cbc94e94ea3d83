use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use cws_core::{LogConfig, Settings};
use tracing::{debug, error};

mod commands;
mod logging;
mod panic_hook;
mod styles;

/// The command-line interface for cws-publish.
#[derive(Debug, Parser)]
#[command(name = "cws-publish")]
#[command(version)]
#[command(styles = styles::clap_styles())]
#[command(
    help_template = "{bin} {version}\n\n{about-with-newline}{usage-heading} {usage}\n\n{all-args}{after-help}"
)]
#[command(about = "Publish extensions to the Chrome Web Store")]
#[command(
    long_about = "cws-publish uploads a packaged extension to the Chrome Web Store and can
publish it right away. It also builds per-variant store provider scripts
from manifest and ruleset files.

Settings are read from $HOME/.cws-publish.yaml (.yml and .toml also work)
or from --config, and can be overridden by environment variables such as
EXTENSION_ID or GOOGLE_REFRESH_TOKEN.
"
)]
#[command(
    after_help = "\x1b[1;32mExamples:\x1b[0m\n  \x1b[36mcws-publish upload -z dist/ext.zip\x1b[0m                 \x1b[2m# Upload only\x1b[0m\n  \x1b[36mcws-publish upload -z dist/ext.zip -p -t trustedTesters\x1b[0m  \x1b[2m# Upload and publish to testers\x1b[0m\n  \x1b[36mcws-publish build-store-configs -s stores -d dist\x1b[0m    \x1b[2m# Copy desktop providers\x1b[0m"
)]
pub(crate) struct Cli {
    /// Path to a YAML or TOML settings file (defaults to $HOME/.cws-publish.yaml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upload a zip archive to the store, optionally publishing it.
    Upload(UploadArgs),
    /// Copy each variant's desktop provider script into a destination directory.
    BuildStoreConfigs(BuildStoreConfigsArgs),
}

#[derive(Debug, Args)]
pub(crate) struct UploadArgs {
    /// Zip archive to upload.
    #[arg(short = 'z', long = "zipPath", value_name = "PATH")]
    zip_path: PathBuf,
    /// Publish right after a successful upload.
    #[arg(
        short,
        long,
        action = ArgAction::Set,
        num_args = 0..=1,
        default_value_t = false,
        default_missing_value = "true",
        value_name = "BOOL"
    )]
    publish: bool,
    /// Publish target: `default` or `trustedTesters`.
    #[arg(short, long, default_value = "default")]
    target: String,
}

#[derive(Debug, Args)]
pub(crate) struct BuildStoreConfigsArgs {
    /// Directory holding one sub-directory per variant.
    #[arg(short, long, value_name = "DIR")]
    src: PathBuf,
    /// Directory receiving `{provider}.js` files.
    #[arg(short, long, value_name = "DIR")]
    dest: PathBuf,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = Settings::load(cli.config.as_deref());
    let log_cfg = settings
        .as_ref()
        .map_or_else(|_| Ok(LogConfig::default()), LogConfig::from_settings);
    logging::init(log_cfg.as_ref().unwrap_or(&LogConfig::default()));
    panic_hook::install();
    debug!("parsed cli arguments: {:?}", cli);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| -> Result<()> {
        let settings = settings.context("unable to load settings")?;
        log_cfg.context("invalid log settings")?;
        run(&cli, &settings)
    }));

    match outcome {
        Ok(Ok(())) => ExitCode::SUCCESS,
        Ok(Err(err)) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
        Err(_) => {
            error!("command aborted after a panic");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli, settings: &Settings) -> Result<()> {
    if let Some(path) = settings.source() {
        debug!("using settings from {}", path.display());
    }

    match &cli.command {
        Command::Upload(args) => commands::upload(settings, args),
        Command::BuildStoreConfigs(args) => commands::build_store_configs(args),
    }
}
