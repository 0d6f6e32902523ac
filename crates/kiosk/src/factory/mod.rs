//! Starting a browser window and wrapping it in an [`App`].

pub mod args;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use kiosk_cdp::Chrome;
use kiosk_common::{KioskError, LaunchError, Result};

use crate::app::{remove_profile, App};
use crate::config::LaunchConfig;

/// Open a window of `width`×`height` showing `url`.
///
/// An empty `url` shows a blank page. An empty `dir` uses a temporary
/// profile directory that is removed on [`App::close`]. Pass `--headless`
/// in `extra_args` to run without a window.
pub async fn new(width: u32, height: u32, url: &str, dir: &str, extra_args: &[&str]) -> Result<App> {
    let mut config = LaunchConfig::new(width, height)
        .with_url(url)
        .with_args(extra_args.iter().copied());
    if !dir.is_empty() {
        config = config.with_profile_dir(dir);
    }
    launch(config).await
}

/// Start a browser for `config`. Nothing is left behind on failure.
pub async fn launch(config: LaunchConfig) -> Result<App> {
    launch_in(config, &std::env::temp_dir()).await
}

async fn launch_in(config: LaunchConfig, temp_root: &Path) -> Result<App> {
    let executable = match &config.executable {
        Some(path) => path.clone(),
        None => kiosk_cdp::locate().ok_or(LaunchError::ExecutableNotFound)?,
    };

    let resolved = config.resolve_in(temp_root)?;
    let owned = resolved.owned_profile();
    info!(
        executable = %executable.display(),
        url = %resolved.url,
        profile = %resolved.profile.path.display(),
        width = config.width,
        height = config.height,
        "launching browser"
    );

    match Chrome::launch(&executable, &resolved.args, config.startup_timeout()).await {
        Ok(chrome) => Ok(App::with_browser(Arc::new(chrome), owned)),
        Err(e) => {
            discard_profile(owned).await;
            Err(KioskError::Launch(e))
        }
    }
}

async fn discard_profile(owned: Option<PathBuf>) {
    if let Some(dir) = owned {
        if let Err(e) = remove_profile(&dir).await {
            warn!(path = %dir.display(), error = %e, "failed to remove profile directory");
        }
    }
}
