//! DevTools protocol message shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use kiosk_common::BrowserError;

/// A command sent to the browser.
#[derive(Debug, Serialize)]
pub(crate) struct Request<'a> {
    pub id: u64,
    pub method: &'a str,
    pub params: Value,
    #[serde(rename = "sessionId", skip_serializing_if = "Option::is_none")]
    pub session_id: Option<&'a str>,
}

/// Any frame received from the browser: a response when `id` is set,
/// otherwise an event.
#[derive(Debug, Deserialize)]
pub(crate) struct Incoming {
    pub id: Option<u64>,
    pub result: Option<Value>,
    pub error: Option<ProtocolError>,
    pub method: Option<String>,
    pub params: Option<Value>,
    #[serde(rename = "sessionId")]
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ProtocolError {
    pub code: i64,
    pub message: String,
}

impl From<ProtocolError> for BrowserError {
    fn from(e: ProtocolError) -> Self {
        BrowserError::Protocol {
            code: e.code,
            message: e.message,
        }
    }
}

/// An event pushed by the browser.
#[derive(Debug, Clone)]
pub(crate) struct Event {
    pub method: String,
    pub params: Value,
    pub session_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RemoteObject {
    #[serde(rename = "type")]
    pub kind: String,
    pub value: Option<Value>,
    pub description: Option<String>,
}

impl RemoteObject {
    /// Text suitable for logs and error messages.
    pub fn display(&self) -> String {
        match (&self.value, &self.description) {
            (Some(Value::String(s)), _) => s.clone(),
            (Some(v), _) => v.to_string(),
            (None, Some(d)) => d.clone(),
            (None, None) => self.kind.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct ExceptionDetails {
    pub text: String,
    pub exception: Option<RemoteObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct EvaluateResult {
    pub result: RemoteObject,
    pub exception_details: Option<ExceptionDetails>,
}

impl EvaluateResult {
    /// The returned value, or the thrown exception as an error.
    pub fn into_value(self) -> Result<Value, BrowserError> {
        if let Some(details) = self.exception_details {
            let message = details
                .exception
                .and_then(|e| e.description)
                .unwrap_or(details.text);
            return Err(BrowserError::Evaluation(message));
        }
        Ok(self.result.value.unwrap_or(Value::Null))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TargetInfo {
    pub target_id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TargetCreated {
    pub target_info: TargetInfo,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ConsoleApiCalled {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub args: Vec<RemoteObject>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExceptionThrown {
    pub exception_details: ExceptionDetails,
}

/// Decode an event payload, mapping failures to `BrowserError::Decode`.
pub(crate) fn decode<T: serde::de::DeserializeOwned>(params: Value) -> Result<T, BrowserError> {
    serde_json::from_value(params).map_err(|e| BrowserError::Decode(e.to_string()))
}
