use std::path::PathBuf;
use std::time::Duration;

/// Boxed error returned by bound native functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum BindError {
    #[error("invalid binding: {0}")]
    InvalidBinding(String),
}

/// Failure of a single remote call into a bound function.
#[derive(Debug, thiserror::Error)]
pub enum CallError {
    #[error("function arguments mismatch: expected {expected}, got {got}")]
    ArgumentCount { expected: usize, got: usize },

    #[error("argument {index} could not be decoded: {source}")]
    ArgumentDecode {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("return value could not be encoded: {0}")]
    ReturnEncode(#[source] serde_json::Error),

    #[error("no binding named {0:?}")]
    UnknownBinding(String),

    #[error("{0}")]
    Native(BoxError),
}

impl CallError {
    /// Wrap an error produced by the bound function itself.
    pub fn native(err: impl Into<BoxError>) -> Self {
        Self::Native(err.into())
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum BrowserError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("protocol error {code}: {message}")]
    Protocol { code: i64, message: String },

    #[error("evaluation failed: {0}")]
    Evaluation(String),

    #[error("navigation failed: {0}")]
    Navigation(String),

    #[error("browser connection closed")]
    Closed,

    #[error("malformed protocol message: {0}")]
    Decode(String),
}

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("no Chrome/Chromium executable found")]
    ExecutableNotFound,

    #[error("failed to start {path}: {source}")]
    Spawn {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("profile directory {path}: {source}")]
    ProfileDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("devtools endpoint: {0}")]
    DevTools(String),

    #[error("browser did not report a devtools endpoint within {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("config parse error: {0}")]
    ParseError(String),
}

#[derive(Debug, thiserror::Error)]
pub enum KioskError {
    #[error(transparent)]
    Bind(#[from] BindError),

    #[error(transparent)]
    Call(#[from] CallError),

    #[error(transparent)]
    Browser(#[from] BrowserError),

    #[error(transparent)]
    Launch(#[from] LaunchError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("value decode error: {0}")]
    Decode(#[from] serde_json::Error),
}
