//! Browser-side collaborator for kiosk apps.
//!
//! - `Browser`: the narrow async interface the app façade drives
//! - `Chrome`: a DevTools Protocol client over `tokio-tungstenite`
//! - `locate`: Chrome/Chromium executable discovery

pub mod browser;
pub mod chrome;
pub mod locate;

pub use browser::Browser;
pub use chrome::Chrome;
pub use locate::{locate, BROWSER_ENV, DOWNLOAD_URL};
