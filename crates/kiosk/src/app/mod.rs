//! The running app: one browser window plus the native functions bound into it.

mod signal;
mod value;

#[cfg(test)]
mod tests;

pub use signal::DoneSignal;
pub use value::JsValue;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use kiosk_bind::{validate_name, Handler, NativeFn, Registry, Signature};
use kiosk_cdp::Browser;
use kiosk_common::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Running,
    /// `close` was called, or the process exited and the owned profile is
    /// not yet removed.
    Closing,
    Closed,
}

/// Handle to a launched browser window.
///
/// All methods take `&self`; share it across tasks with an `Arc`.
pub struct App {
    browser: Arc<dyn Browser>,
    bindings: Registry,
    done: CancellationToken,
    closing: AtomicBool,
    /// Profile directory created for this app, removed once by `close`.
    owned_profile: Mutex<Option<PathBuf>>,
}

impl App {
    /// Wrap a started browser. Must be called inside a tokio runtime.
    ///
    /// `owned_profile` is the profile directory to delete on close, if this
    /// app created it.
    pub fn with_browser(browser: Arc<dyn Browser>, owned_profile: Option<PathBuf>) -> Self {
        let done = CancellationToken::new();

        let observer = Arc::clone(&browser);
        let token = done.clone();
        tokio::spawn(async move {
            observer.wait().await;
            debug!("browser process exited");
            token.cancel();
        });

        Self {
            browser,
            bindings: Registry::new(),
            done,
            closing: AtomicBool::new(false),
            owned_profile: Mutex::new(owned_profile),
        }
    }

    /// Navigate the window to `url`.
    pub async fn load(&self, url: &str) -> Result<()> {
        debug!(url, "loading");
        Ok(self.browser.load(url).await?)
    }

    /// Expose `f` to the page as `window[name]`, returning a promise.
    ///
    /// Binding an existing name replaces its function; later calls reach the
    /// new one.
    pub async fn bind<F, Args>(&self, name: &str, f: F) -> Result<()>
    where
        F: NativeFn<Args>,
        Args: 'static,
    {
        self.bind_handler(name, Handler::new(f)).await
    }

    /// Same as [`App::bind`] for an already wrapped handler.
    pub async fn bind_handler(&self, name: &str, handler: Handler) -> Result<()> {
        validate_name(name)?;
        self.browser.bind(name, handler.clone()).await?;
        debug!(name, signature = %handler.signature(), "function bound");
        self.bindings.insert(name, handler);
        Ok(())
    }

    /// Names bound through this app and their signatures, sorted by name.
    pub fn bindings(&self) -> Vec<(String, Signature)> {
        self.bindings.signatures()
    }

    /// Evaluate `js` in the page. Promises are awaited.
    pub async fn eval(&self, js: &str) -> JsValue {
        let result = self.browser.eval(js).await;
        if let Err(e) = &result {
            debug!(error = %e, "eval failed");
        }
        JsValue::new(result)
    }

    /// Signal that fires once the browser process has exited.
    pub fn done(&self) -> DoneSignal {
        DoneSignal::new(self.done.clone())
    }

    pub fn state(&self) -> AppState {
        let cleanup_pending = self
            .owned_profile
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        match (self.done.is_cancelled(), cleanup_pending) {
            (true, false) => AppState::Closed,
            (true, true) => AppState::Closing,
            (false, _) if self.closing.load(Ordering::SeqCst) => AppState::Closing,
            (false, _) => AppState::Running,
        }
    }

    /// Kill the browser, wait for it to exit, and remove the profile
    /// directory if this app created it.
    ///
    /// Safe to call more than once and after the process died on its own.
    /// If the profile cannot be removed the app stays
    /// [`AppState::Closing`] and a later `close` retries the removal.
    pub async fn close(&self) -> Result<()> {
        if !self.closing.swap(true, Ordering::SeqCst) {
            info!("closing app");
        }
        if let Err(e) = self.browser.kill().await {
            debug!(error = %e, "kill failed, process may already be gone");
        }
        self.done.cancelled().await;

        // Cleared only after removal succeeds.
        let profile = self
            .owned_profile
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        if let Some(dir) = profile {
            remove_profile(&dir).await?;
            self.owned_profile
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .take();
        }
        Ok(())
    }
}

impl Drop for App {
    /// A dropped app that was never closed still takes its browser down.
    fn drop(&mut self) {
        if self.state() == AppState::Closed {
            return;
        }
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("app dropped outside a runtime; browser left running");
            return;
        };
        let browser = Arc::clone(&self.browser);
        let done = self.done.clone();
        let profile = self
            .owned_profile
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        runtime.spawn(async move {
            let _ = browser.kill().await;
            done.cancelled().await;
            if let Some(dir) = profile {
                if let Err(e) = remove_profile(&dir).await {
                    warn!(path = %dir.display(), error = %e, "failed to remove profile directory");
                }
            }
        });
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("state", &self.state())
            .field("bindings", &self.bindings)
            .finish_non_exhaustive()
    }
}

/// Remove a profile directory. One that is already gone is fine.
pub(crate) async fn remove_profile(dir: &Path) -> std::io::Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {
            debug!(path = %dir.display(), "profile directory removed");
            Ok(())
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}
