//! Conversion between raw JSON argument lists and native values.

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use kiosk_common::CallError;

/// Fail with `ArgumentCount` unless `got == expected`.
pub fn check_arity(expected: usize, got: usize) -> Result<(), CallError> {
    if expected != got {
        return Err(CallError::ArgumentCount { expected, got });
    }
    Ok(())
}

/// Decode the argument at `index` into `T`.
pub fn decode_arg<T: DeserializeOwned>(index: usize, raw: Value) -> Result<T, CallError> {
    serde_json::from_value(raw).map_err(|source| CallError::ArgumentDecode { index, source })
}

/// Serialize a native return value into its wire form.
pub fn encode_return<T: Serialize + ?Sized>(value: &T) -> Result<Value, CallError> {
    serde_json::to_value(value).map_err(CallError::ReturnEncode)
}

/// An arity-checked argument list consumed front to back.
pub struct Arguments {
    raw: std::vec::IntoIter<Value>,
    expected: usize,
    consumed: usize,
}

impl Arguments {
    /// Check the count up front so nothing is decoded on a mismatch.
    pub fn new(raw: Vec<Value>, expected: usize) -> Result<Self, CallError> {
        check_arity(expected, raw.len())?;
        Ok(Self {
            raw: raw.into_iter(),
            expected,
            consumed: 0,
        })
    }

    /// Decode the next argument into `T`.
    pub fn next<T: DeserializeOwned>(&mut self) -> Result<T, CallError> {
        let raw = self.raw.next().ok_or(CallError::ArgumentCount {
            expected: self.expected,
            got: self.consumed,
        })?;
        let index = self.consumed;
        self.consumed += 1;
        decode_arg(index, raw)
    }
}
