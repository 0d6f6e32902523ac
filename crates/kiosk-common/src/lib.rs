pub mod errors;

pub use errors::{
    BindError, BoxError, BrowserError, CallError, ConfigError, KioskError, LaunchError,
};

pub type Result<T> = std::result::Result<T, KioskError>;
