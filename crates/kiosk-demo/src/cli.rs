use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use kiosk::{ConfigError, LaunchConfig};

/// kiosk-demo: small desktop apps driven through an installed Chrome.
#[derive(Parser, Debug)]
#[command(name = "kiosk-demo", version, about)]
pub struct Args {
    /// Which demo to run.
    #[arg(value_enum, default_value_t = Demo::Hello)]
    pub demo: Demo,

    /// Launch config file (TOML).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Window width, overrides the config file.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height, overrides the config file.
    #[arg(long)]
    pub height: Option<u32>,

    /// Browser profile directory. A temporary one is used if omitted.
    #[arg(long)]
    pub profile: Option<PathBuf>,

    /// Run without a window.
    #[arg(long)]
    pub headless: bool,

    /// Log level override (debug, info, warn, error).
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Demo {
    /// A static page, closes when the window does.
    Hello,
    /// Buttons calling into a shared Rust counter.
    Counter,
}

pub fn parse() -> Args {
    Args::parse()
}

impl Args {
    /// The config file (or demo defaults) with command-line overrides applied.
    pub fn launch_config(&self) -> Result<LaunchConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => LaunchConfig::load_from_path(path)?,
            None => LaunchConfig::new(480, 320),
        };
        if let Some(width) = self.width {
            config.width = width;
        }
        if let Some(height) = self.height {
            config.height = height;
        }
        if let Some(profile) = &self.profile {
            config.profile_dir = Some(profile.clone());
        }
        if self.headless && !config.extra_args.iter().any(|a| a == "--headless") {
            config.extra_args.push("--headless".to_string());
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let args = Args::try_parse_from(["kiosk-demo"]).unwrap();
        assert_eq!(args.demo, Demo::Hello);
        let config = args.launch_config().unwrap();
        assert_eq!((config.width, config.height), (480, 320));
        assert!(config.extra_args.is_empty());
    }

    #[test]
    fn flags_override_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kiosk.toml");
        std::fs::write(&path, "width = 1024\nheight = 768\nextra_args = [\"--headless\"]\n").unwrap();

        let args = Args::try_parse_from([
            "kiosk-demo",
            "counter",
            "--config",
            path.to_str().unwrap(),
            "--height",
            "400",
            "--headless",
        ])
        .unwrap();
        assert_eq!(args.demo, Demo::Counter);

        let config = args.launch_config().unwrap();
        assert_eq!(config.width, 1024);
        assert_eq!(config.height, 400);
        assert_eq!(config.extra_args, vec!["--headless".to_string()]);
    }

    #[test]
    fn missing_config_file() {
        let args = Args::try_parse_from(["kiosk-demo", "--config", "/nonexistent/kiosk.toml"]).unwrap();
        assert!(matches!(
            args.launch_config(),
            Err(ConfigError::FileNotFound(_))
        ));
    }

    #[test]
    fn unknown_demo_rejected() {
        assert!(Args::try_parse_from(["kiosk-demo", "snake"]).is_err());
    }
}
