//! Binding adapter between native Rust functions and the page.
//!
//! Provides:
//! - Argument decoding and return encoding over `serde_json::Value`
//! - `NativeFn`: typed functions with up to eight parameters
//! - `Handler`: the uniform `(args) -> (result, error)` call shape
//! - `Registry`: concurrent name → handler map

pub mod handler;
pub mod marshal;
pub mod registry;
pub mod reply;


pub use handler::{Handler, NativeFn, Signature};
pub use registry::{validate_name, Registry};
pub use reply::{IntoReply, Json, Reply, ReturnShape};
