//! SPS binary entry point
//!
//! Loads the config, connects to the sound server, and dispatches to the
//! check, list, or switch command based on CLI arguments.

use clap::Parser;
use color_eyre::eyre::Result;
use sps::cli::{Args, Mode};
use sps::server::{self, pactl::PulseServer};
use sps::{built_info, commands, Config, SinkCatalog};
use tracing::debug;

/// Initialize logging
///
/// `RUST_LOG` wins; otherwise only this crate logs, at the configured level.
/// Logs go to stderr so stdout stays clean for `--json`.
fn init_logging(log_level: &str) {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(format!("sps={log_level}"))),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    let config = Config::load(args.config.as_deref())?;
    init_logging(&config.settings.log_level);
    debug!(
        "{} {} ({})",
        built_info::PKG_NAME,
        built_info::PKG_VERSION,
        built_info::GIT_COMMIT_HASH_SHORT.unwrap_or("unknown commit")
    );

    let server = PulseServer::new(config.settings.timeout);
    server::connect(&server, config.settings.control_module.as_deref()).await?;

    let catalog = SinkCatalog::load(&config, &server).await?;

    match args.mode() {
        Mode::Check => {
            let outcome = commands::check(&catalog, &server).await?;
            commands::print_outcome(&outcome, args.json)
        }
        Mode::List => {
            let listing = commands::list(&catalog, &server).await?;
            commands::print_listing(&listing, args.json)
        }
        Mode::Switch => {
            let outcome = commands::switch(&catalog, &server).await?;
            commands::print_outcome(&outcome, args.json)?;
            if config.settings.notify {
                commands::notify_switch(&outcome);
            }
            Ok(())
        }
    }
}
