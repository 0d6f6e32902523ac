//! Browser command line.

use std::path::Path;

/// Page shown when no URL is given.
pub const BLANK_PAGE: &str = "data:text/html,<html></html>";

/// Flags every kiosk window starts with.
pub static DEFAULT_ARGS: &[&str] = &[
    "--disable-background-networking",
    "--disable-background-timer-throttling",
    "--disable-backgrounding-occluded-windows",
    "--disable-breakpad",
    "--disable-client-side-phishing-detection",
    "--disable-default-apps",
    "--disable-dev-shm-usage",
    "--disable-infobars",
    "--disable-extensions",
    "--disable-features=site-per-process",
    "--disable-hang-monitor",
    "--disable-ipc-flooding-protection",
    "--disable-popup-blocking",
    "--disable-prompt-on-repost",
    "--disable-renderer-backgrounding",
    "--disable-sync",
    "--disable-translate",
    "--disable-windows10-custom-titlebar",
    "--metrics-recording-only",
    "--no-first-run",
    "--no-default-browser-check",
    "--safebrowsing-disable-auto-update",
    "--enable-automation",
    "--password-store=basic",
    "--use-mock-keychain",
];

/// Defaults first, then window flags, caller extras, and the debugging port
/// last so extras cannot displace it.
pub fn build_args(
    url: &str,
    profile_dir: &Path,
    width: u32,
    height: u32,
    extra: &[String],
) -> Vec<String> {
    let mut args: Vec<String> = DEFAULT_ARGS.iter().map(|s| s.to_string()).collect();
    args.push(format!("--app={url}"));
    args.push(format!("--user-data-dir={}", profile_dir.display()));
    args.push(format!("--window-size={width},{height}"));
    args.extend(extra.iter().cloned());
    args.push("--remote-debugging-port=0".to_string());
    args
}
