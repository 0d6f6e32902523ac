//! Normalization of native return values into a uniform reply.
//!
//! The shape of a reply depends only on the declared return type:
//!
//! | return type        | results | reply                     |
//! |--------------------|---------|---------------------------|
//! | `()`               | 0       | `(empty, none)`           |
//! | plain value `T`    | 1       | `(value, none)`           |
//! | `Result<(), E>`    | 1       | `(empty, error?)`         |
//! | `Result<T, E>`     | 2       | `(value, none)` or `(empty, error)` |
//! | `(T, Option<E>)`   | 2       | `(value, error?)`         |

use std::collections::{BTreeMap, HashMap};
use std::hash::Hash;

use serde::Serialize;
use serde_json::Value;

use kiosk_common::{BoxError, CallError};

use crate::marshal::encode_return;

/// Declared result layout of a bound function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnShape {
    /// No results.
    Unit,
    /// A single plain value.
    Value,
    /// A single error slot.
    Error,
    /// A value followed by an error slot.
    ValueAndError,
}

impl ReturnShape {
    /// Number of declared results.
    pub const fn results(self) -> usize {
        match self {
            ReturnShape::Unit => 0,
            ReturnShape::Value | ReturnShape::Error => 1,
            ReturnShape::ValueAndError => 2,
        }
    }
}

/// Outcome of one call through a uniform handler.
#[derive(Debug, Default)]
pub struct Reply {
    pub value: Option<Value>,
    pub error: Option<CallError>,
}

impl Reply {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn value(value: Value) -> Self {
        Self {
            value: Some(value),
            error: None,
        }
    }

    pub fn failed(error: CallError) -> Self {
        Self {
            value: None,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Collapse into a `Result`, dropping any value paired with an error.
    pub fn into_result(self) -> Result<Option<Value>, CallError> {
        match self.error {
            Some(err) => Err(err),
            None => Ok(self.value),
        }
    }
}

/// Return types a bound function may declare.
pub trait IntoReply {
    const SHAPE: ReturnShape;

    fn into_reply(self) -> Reply;
}

/// Serializes any `T: Serialize` as a plain value result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Json<T>(pub T);

fn serialize<T: Serialize + ?Sized>(value: &T) -> Reply {
    match encode_return(value) {
        Ok(value) => Reply::value(value),
        Err(err) => Reply::failed(err),
    }
}

impl IntoReply for () {
    const SHAPE: ReturnShape = ReturnShape::Unit;

    fn into_reply(self) -> Reply {
        Reply::empty()
    }
}

impl IntoReply for Value {
    const SHAPE: ReturnShape = ReturnShape::Value;

    fn into_reply(self) -> Reply {
        Reply::value(self)
    }
}

macro_rules! impl_into_reply_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoReply for $ty {
                const SHAPE: ReturnShape = ReturnShape::Value;

                fn into_reply(self) -> Reply {
                    serialize(&self)
                }
            }
        )*
    };
}

impl_into_reply_value!(
    bool,
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    char,
    String,
    &'static str,
);

impl<T: Serialize> IntoReply for Json<T> {
    const SHAPE: ReturnShape = ReturnShape::Value;

    fn into_reply(self) -> Reply {
        serialize(&self.0)
    }
}

impl<T: Serialize> IntoReply for Vec<T> {
    const SHAPE: ReturnShape = ReturnShape::Value;

    fn into_reply(self) -> Reply {
        serialize(&self)
    }
}

impl<T: Serialize> IntoReply for Option<T> {
    const SHAPE: ReturnShape = ReturnShape::Value;

    fn into_reply(self) -> Reply {
        serialize(&self)
    }
}

impl<K: Serialize + Eq + Hash, V: Serialize> IntoReply for HashMap<K, V> {
    const SHAPE: ReturnShape = ReturnShape::Value;

    fn into_reply(self) -> Reply {
        serialize(&self)
    }
}

impl<K: Serialize + Ord, V: Serialize> IntoReply for BTreeMap<K, V> {
    const SHAPE: ReturnShape = ReturnShape::Value;

    fn into_reply(self) -> Reply {
        serialize(&self)
    }
}

impl<T, E> IntoReply for Result<T, E>
where
    T: IntoReply,
    E: Into<BoxError>,
{
    const SHAPE: ReturnShape = match T::SHAPE {
        ReturnShape::Unit => ReturnShape::Error,
        _ => ReturnShape::ValueAndError,
    };

    fn into_reply(self) -> Reply {
        match self {
            Ok(value) => value.into_reply(),
            Err(err) => Reply::failed(CallError::native(err)),
        }
    }
}

impl<T, E> IntoReply for (T, Option<E>)
where
    T: Serialize,
    E: Into<BoxError>,
{
    const SHAPE: ReturnShape = ReturnShape::ValueAndError;

    fn into_reply(self) -> Reply {
        let (value, err) = self;
        match encode_return(&value) {
            Ok(value) => Reply {
                value: Some(value),
                error: err.map(CallError::native),
            },
            Err(encode) => Reply::failed(encode),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn shapes_follow_declared_type() {
        assert_eq!(<() as IntoReply>::SHAPE, ReturnShape::Unit);
        assert_eq!(<i64 as IntoReply>::SHAPE, ReturnShape::Value);
        assert_eq!(<Result<(), String> as IntoReply>::SHAPE, ReturnShape::Error);
        assert_eq!(
            <Result<i64, String> as IntoReply>::SHAPE,
            ReturnShape::ValueAndError
        );
        assert_eq!(
            <(String, Option<String>) as IntoReply>::SHAPE,
            ReturnShape::ValueAndError
        );
    }

    #[test]
    fn result_counts() {
        assert_eq!(ReturnShape::Unit.results(), 0);
        assert_eq!(ReturnShape::Value.results(), 1);
        assert_eq!(ReturnShape::Error.results(), 1);
        assert_eq!(ReturnShape::ValueAndError.results(), 2);
    }

    #[test]
    fn unit_is_empty() {
        let reply = ().into_reply();
        assert!(reply.value.is_none());
        assert!(reply.error.is_none());
    }

    #[test]
    fn plain_values_serialize() {
        assert_eq!(42i64.into_reply().value, Some(json!(42)));
        assert_eq!("hi".into_reply().value, Some(json!("hi")));
        assert_eq!(vec![1, 2].into_reply().value, Some(json!([1, 2])));
        assert_eq!(None::<u8>.into_reply().value, Some(Value::Null));
    }

    #[test]
    fn json_wrapper_serializes_structs() {
        #[derive(Serialize)]
        struct Size {
            width: u32,
            height: u32,
        }
        let reply = Json(Size {
            width: 480,
            height: 320,
        })
        .into_reply();
        assert_eq!(reply.value, Some(json!({"width": 480, "height": 320})));
    }

    #[test]
    fn error_slot_ok_is_empty() {
        let reply = Ok::<(), String>(()).into_reply();
        assert!(reply.value.is_none());
        assert!(reply.is_ok());
    }

    #[test]
    fn error_slot_err_propagates() {
        let reply = Err::<(), _>("boom").into_reply();
        assert!(reply.value.is_none());
        assert_eq!(reply.error.unwrap().to_string(), "boom");
    }

    #[test]
    fn value_and_error_keeps_both() {
        let reply = (String::new(), Some("not found")).into_reply();
        assert_eq!(reply.value, Some(json!("")));
        assert_eq!(reply.error.unwrap().to_string(), "not found");

        let reply = ("found".to_string(), None::<String>).into_reply();
        assert_eq!(reply.value, Some(json!("found")));
        assert!(reply.error.is_none());
    }

    #[test]
    fn into_result_prefers_error() {
        let result = (1u8, Some("bad")).into_reply().into_result();
        assert!(result.is_err());
        let result = 1u8.into_reply().into_result().unwrap();
        assert_eq!(result, Some(json!(1)));
    }
}
