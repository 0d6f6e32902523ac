//! Desktop apps with an HTML front end and a Rust back end.
//!
//! A kiosk app is an installed Chrome/Chromium running in app mode, driven
//! over the DevTools Protocol. Rust functions bound with [`App::bind`] show
//! up in the page as `window[name](...)`, returning a promise.
//!
//! ```no_run
//! # async fn demo() -> kiosk::Result<()> {
//! let app = kiosk::new(480, 320, "", "", &[]).await?;
//! app.bind("add", |a: i64, b: i64| a + b).await?;
//! let sum = app.eval("add(2, 3)").await.int();
//! assert_eq!(sum, 5);
//! app.close().await?;
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod config;
pub mod factory;

pub use app::{App, AppState, DoneSignal, JsValue};
pub use config::LaunchConfig;
pub use factory::{launch, new};

pub use kiosk_bind::{Handler, IntoReply, Json, NativeFn, Reply, ReturnShape, Signature};
pub use kiosk_cdp::{locate, Browser, BROWSER_ENV, DOWNLOAD_URL};
pub use kiosk_common::{
    BindError, BoxError, BrowserError, CallError, ConfigError, KioskError, LaunchError, Result,
};
