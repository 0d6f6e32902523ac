use async_trait::async_trait;
use serde_json::Value;

use kiosk_bind::Handler;
use kiosk_common::BrowserError;

/// The protocol client driving a browser process.
///
/// This is the only surface the app façade talks to; [`crate::Chrome`] is
/// the DevTools implementation.
#[async_trait]
pub trait Browser: Send + Sync {
    /// Navigate the page to `url`.
    async fn load(&self, url: &str) -> Result<(), BrowserError>;

    /// Evaluate `js` in the page, awaiting promises, and return the result by value.
    async fn eval(&self, js: &str) -> Result<Value, BrowserError>;

    /// Expose `handler` to the page as `window[name]`.
    async fn bind(&self, name: &str, handler: Handler) -> Result<(), BrowserError>;

    /// Ask the process to terminate. Fails if it is already gone.
    async fn kill(&self) -> Result<(), BrowserError>;

    /// Resolve once the process has exited, for whatever reason.
    async fn wait(&self);
}
