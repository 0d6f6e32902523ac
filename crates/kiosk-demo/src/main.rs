//! kiosk-demo: example apps for the kiosk crate.

mod cli;
mod demos;

use std::process::ExitCode;

use tracing::{error, info};
use tracing_subscriber::filter::{Directive, LevelFilter};
use tracing_subscriber::EnvFilter;

use kiosk::{App, KioskError, LaunchError};

use crate::cli::Demo;

const DEFAULT_LOG_DIRECTIVE: &str = "kiosk=info";

#[tokio::main]
async fn main() -> ExitCode {
    let args = cli::parse();

    let directive: Directive = args
        .log_level
        .as_deref()
        .unwrap_or(DEFAULT_LOG_DIRECTIVE)
        .parse()
        .unwrap_or_else(|_| LevelFilter::INFO.into());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .init();

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "demo failed");
            if matches!(e, KioskError::Launch(LaunchError::ExecutableNotFound)) {
                eprintln!(
                    "No Chrome/Chromium found. Install one from {} or set {}.",
                    kiosk::DOWNLOAD_URL,
                    kiosk::BROWSER_ENV
                );
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(args: cli::Args) -> kiosk::Result<()> {
    let config = args.launch_config()?;
    info!(demo = ?args.demo, width = config.width, height = config.height, "starting");

    let app = match args.demo {
        Demo::Hello => demos::hello::start(config).await?,
        Demo::Counter => demos::counter::start(config).await?,
    };
    wait_for_exit(&app).await;
    app.close().await?;
    info!("exiting");
    Ok(())
}

/// Until the window is closed or ctrl-c.
async fn wait_for_exit(app: &App) {
    let done = app.done();
    tokio::select! {
        _ = done.wait() => info!("window closed"),
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }
}
