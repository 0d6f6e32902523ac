use std::collections::HashMap;

use serde::de::DeserializeOwned;
use serde_json::Value;

use kiosk_common::{BrowserError, KioskError};

/// Result of evaluating JavaScript in the page.
///
/// Carries either the returned value or the evaluation error. The typed
/// accessors fall back to the type's default when the value does not fit.
#[derive(Debug, Clone)]
pub struct JsValue {
    raw: Value,
    err: Option<BrowserError>,
}

impl JsValue {
    pub(crate) fn new(result: Result<Value, BrowserError>) -> Self {
        match result {
            Ok(raw) => Self { raw, err: None },
            Err(err) => Self {
                raw: Value::Null,
                err: Some(err),
            },
        }
    }

    fn from_raw(raw: Value) -> Self {
        Self { raw, err: None }
    }

    pub fn err(&self) -> Option<&BrowserError> {
        self.err.as_ref()
    }

    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn into_result(self) -> Result<Value, BrowserError> {
        match self.err {
            Some(err) => Err(err),
            None => Ok(self.raw),
        }
    }

    /// Decode into `T`, failing with the evaluation error if there was one.
    pub fn to<T: DeserializeOwned>(&self) -> Result<T, KioskError> {
        if let Some(err) = &self.err {
            return Err(err.clone().into());
        }
        Ok(T::deserialize(&self.raw)?)
    }

    pub fn float(&self) -> f64 {
        self.to().unwrap_or_default()
    }

    /// JS numbers are doubles; fractions are truncated.
    pub fn int(&self) -> i64 {
        self.float() as i64
    }

    pub fn string(&self) -> String {
        self.to().unwrap_or_default()
    }

    pub fn bool(&self) -> bool {
        self.to().unwrap_or_default()
    }

    pub fn object(&self) -> HashMap<String, JsValue> {
        match (&self.err, &self.raw) {
            (None, Value::Object(map)) => map
                .iter()
                .map(|(k, v)| (k.clone(), Self::from_raw(v.clone())))
                .collect(),
            _ => HashMap::new(),
        }
    }

    pub fn array(&self) -> Vec<JsValue> {
        match (&self.err, &self.raw) {
            (None, Value::Array(items)) => items.iter().cloned().map(Self::from_raw).collect(),
            _ => Vec::new(),
        }
    }

    /// The value re-serialized as JSON.
    pub fn bytes(&self) -> Vec<u8> {
        serde_json::to_vec(&self.raw).unwrap_or_default()
    }
}
