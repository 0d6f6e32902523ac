//! Launch configuration and its TOML loader.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use uuid::Uuid;

use kiosk_common::{ConfigError, LaunchError};

use crate::factory::args::{build_args, BLANK_PAGE};

/// Everything needed to start a kiosk window.
///
/// Missing TOML fields take the `Default` values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LaunchConfig {
    pub width: u32,
    pub height: u32,
    /// Initial page; empty means a blank page.
    pub url: String,
    /// Browser profile directory; unset or empty means a temporary one that
    /// is deleted on close.
    pub profile_dir: Option<PathBuf>,
    /// Extra browser flags, placed after the defaults.
    pub extra_args: Vec<String>,
    /// Browser executable; unset means [`kiosk_cdp::locate`].
    pub executable: Option<PathBuf>,
    pub startup_timeout_secs: u64,
}

impl Default for LaunchConfig {
    fn default() -> Self {
        Self {
            width: 800,
            height: 600,
            url: String::new(),
            profile_dir: None,
            extra_args: Vec::new(),
            executable: None,
            startup_timeout_secs: 30,
        }
    }
}

/// Profile directory chosen for one launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    pub path: PathBuf,
    /// Created by us, so ours to delete.
    pub owned: bool,
}

/// A config turned into a concrete command line.
#[derive(Debug, Clone)]
pub struct ResolvedLaunch {
    pub url: String,
    pub profile: Profile,
    pub args: Vec<String>,
}

impl ResolvedLaunch {
    /// The profile directory the app must delete on close, if we created it.
    pub fn owned_profile(&self) -> Option<PathBuf> {
        self.profile.owned.then(|| self.profile.path.clone())
    }
}

impl LaunchConfig {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ..Self::default()
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn with_profile_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.profile_dir = Some(dir.into());
        self
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extra_args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    /// Load from a TOML file.
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            ConfigError::ParseError(format!("failed to read {}: {e}", path.display()))
        })?;

        let config: LaunchConfig = toml::from_str(&content)
            .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

        info!("loaded launch config from {}", path.display());
        Ok(config)
    }

    pub fn startup_timeout(&self) -> Duration {
        Duration::from_secs(self.startup_timeout_secs)
    }

    /// Pick the URL and profile directory and build the argument vector.
    ///
    /// Creates the temporary profile directory when none was given.
    pub fn resolve(&self) -> Result<ResolvedLaunch, LaunchError> {
        self.resolve_in(&std::env::temp_dir())
    }

    /// [`LaunchConfig::resolve`] with temporary profiles created under `temp_root`.
    pub(crate) fn resolve_in(&self, temp_root: &Path) -> Result<ResolvedLaunch, LaunchError> {
        let url = if self.url.is_empty() {
            BLANK_PAGE.to_string()
        } else {
            self.url.clone()
        };

        let profile = match self
            .profile_dir
            .as_deref()
            .filter(|dir| !dir.as_os_str().is_empty())
        {
            Some(dir) => Profile {
                path: dir.to_path_buf(),
                owned: false,
            },
            None => Profile {
                path: create_temp_profile(temp_root)?,
                owned: true,
            },
        };

        let args = build_args(
            &url,
            &profile.path,
            self.width,
            self.height,
            &self.extra_args,
        );
        Ok(ResolvedLaunch { url, profile, args })
    }
}

fn create_temp_profile(root: &Path) -> Result<PathBuf, LaunchError> {
    let path = root.join(format!("kiosk-{}", Uuid::new_v4().simple()));
    std::fs::create_dir_all(&path).map_err(|source| LaunchError::ProfileDir {
        path: path.clone(),
        source,
    })?;
    debug!(path = %path.display(), "created temporary profile");
    Ok(path)
}
