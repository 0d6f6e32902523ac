//! Chrome/Chromium executable discovery.

use std::path::{Path, PathBuf};

use tracing::debug;

/// Environment variable naming an explicit browser executable.
pub const BROWSER_ENV: &str = "KIOSK_CHROME";

/// Where to send people who have no browser installed.
pub const DOWNLOAD_URL: &str = "https://www.google.com/chrome/";

#[cfg(target_os = "macos")]
const CANDIDATES: &[&str] = &[
    "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
    "/Applications/Google Chrome Canary.app/Contents/MacOS/Google Chrome Canary",
    "/Applications/Chromium.app/Contents/MacOS/Chromium",
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
];

#[cfg(all(unix, not(target_os = "macos")))]
const CANDIDATES: &[&str] = &[
    "/usr/bin/google-chrome-stable",
    "/usr/bin/google-chrome",
    "/usr/bin/chromium",
    "/usr/bin/chromium-browser",
    "/snap/bin/chromium",
];

/// Install roots relative to `LocalAppData`, `ProgramFiles` and `ProgramFiles(x86)`.
#[cfg(windows)]
const WINDOWS_SUFFIXES: &[&str] = &[
    "Google/Chrome/Application/chrome.exe",
    "Chromium/Application/chrome.exe",
];

/// Candidate executable paths for this platform, most preferred first.
pub fn candidates() -> Vec<PathBuf> {
    #[cfg(windows)]
    {
        let roots: Vec<PathBuf> = [
            dirs::data_local_dir(),
            std::env::var_os("ProgramFiles").map(PathBuf::from),
            std::env::var_os("ProgramFiles(x86)").map(PathBuf::from),
        ]
        .into_iter()
        .flatten()
        .collect();
        // Chrome in every root before Chromium in any.
        WINDOWS_SUFFIXES
            .iter()
            .flat_map(|suffix| roots.iter().map(move |root| root.join(suffix)))
            .collect()
    }
    #[cfg(not(windows))]
    {
        CANDIDATES.iter().map(PathBuf::from).collect()
    }
}

/// Find a browser executable: the `KIOSK_CHROME` override if it exists,
/// otherwise the first existing platform candidate.
pub fn locate() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(BROWSER_ENV).map(PathBuf::from) {
        if path.exists() {
            debug!(path = %path.display(), "using browser from {BROWSER_ENV}");
            return Some(path);
        }
        debug!(path = %path.display(), "{BROWSER_ENV} points at a missing file, ignoring");
    }
    let found = first_existing(&candidates());
    match &found {
        Some(path) => debug!(path = %path.display(), "browser located"),
        None => debug!("no browser found in platform locations"),
    }
    found
}

/// First path in `paths` that exists on disk.
pub fn first_existing<P: AsRef<Path>>(paths: &[P]) -> Option<PathBuf> {
    paths
        .iter()
        .map(AsRef::as_ref)
        .find(|p| p.exists())
        .map(Path::to_path_buf)
}
