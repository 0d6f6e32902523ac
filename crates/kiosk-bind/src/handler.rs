//! Typed native functions erased into one uniform handler shape.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use kiosk_common::CallError;

use crate::marshal::Arguments;
use crate::reply::{IntoReply, Reply, ReturnShape};

/// Reflected signature of a bound function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    /// Parameter type names, in call order.
    pub params: Vec<&'static str>,
    pub returns: ReturnShape,
    /// Raw handlers accept any number of arguments.
    pub variadic: bool,
}

impl Signature {
    pub fn new(params: Vec<&'static str>, returns: ReturnShape) -> Self {
        Self {
            params,
            returns,
            variadic: false,
        }
    }

    pub fn arity(&self) -> usize {
        self.params.len()
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.variadic {
            write!(f, "fn(..)")?;
        } else {
            write!(f, "fn({})", self.params.join(", "))?;
        }
        match self.returns {
            ReturnShape::Unit => Ok(()),
            ReturnShape::Value => write!(f, " -> value"),
            ReturnShape::Error => write!(f, " -> error"),
            ReturnShape::ValueAndError => write!(f, " -> (value, error)"),
        }
    }
}

/// A native function callable with JSON-decoded arguments.
///
/// Implemented for every `Fn(A1, .., An) -> R` with up to eight
/// parameters, where each `Ai` is `DeserializeOwned` and `R` is
/// [`IntoReply`]. `Args` is the parameter tuple and only exists to keep
/// the implementations apart.
pub trait NativeFn<Args>: Send + Sync + 'static {
    fn signature() -> Signature;

    fn invoke(&self, args: Vec<Value>) -> Reply;
}

macro_rules! count {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count!($($tail)*) };
}

macro_rules! impl_native_fn {
    ($($ty:ident),*) => {
        #[allow(non_snake_case, unused_mut, unused_variables)]
        impl<F, R, $($ty,)*> NativeFn<($($ty,)*)> for F
        where
            F: Fn($($ty),*) -> R + Send + Sync + 'static,
            R: IntoReply,
            $($ty: DeserializeOwned,)*
        {
            fn signature() -> Signature {
                Signature::new(vec![$(std::any::type_name::<$ty>()),*], R::SHAPE)
            }

            fn invoke(&self, args: Vec<Value>) -> Reply {
                let decoded = (|| -> Result<($($ty,)*), CallError> {
                    let mut args = Arguments::new(args, count!($($ty)*))?;
                    Ok(($(args.next::<$ty>()?,)*))
                })();
                match decoded {
                    Ok(($($ty,)*)) => (self)($($ty),*).into_reply(),
                    Err(err) => Reply::failed(err),
                }
            }
        }
    };
}

impl_native_fn!();
impl_native_fn!(A1);
impl_native_fn!(A1, A2);
impl_native_fn!(A1, A2, A3);
impl_native_fn!(A1, A2, A3, A4);
impl_native_fn!(A1, A2, A3, A4, A5);
impl_native_fn!(A1, A2, A3, A4, A5, A6);
impl_native_fn!(A1, A2, A3, A4, A5, A6, A7);
impl_native_fn!(A1, A2, A3, A4, A5, A6, A7, A8);

type CallFn = dyn Fn(Vec<Value>) -> Reply + Send + Sync;

/// The uniform `(args) -> (result, error)` shape every binding exposes.
#[derive(Clone)]
pub struct Handler {
    signature: Arc<Signature>,
    call: Arc<CallFn>,
}

impl Handler {
    /// Wrap a typed native function.
    pub fn new<F, Args>(f: F) -> Self
    where
        F: NativeFn<Args>,
        Args: 'static,
    {
        Self {
            signature: Arc::new(F::signature()),
            call: Arc::new(move |args| f.invoke(args)),
        }
    }

    /// Wrap a function over the raw argument list. No count check is done.
    pub fn raw<F, R>(f: F) -> Self
    where
        F: Fn(Vec<Value>) -> R + Send + Sync + 'static,
        R: IntoReply + 'static,
    {
        Self {
            signature: Arc::new(Signature {
                params: Vec::new(),
                returns: R::SHAPE,
                variadic: true,
            }),
            call: Arc::new(move |args| f(args).into_reply()),
        }
    }

    pub fn call(&self, args: Vec<Value>) -> Reply {
        (self.call)(args)
    }

    pub fn signature(&self) -> &Signature {
        &self.signature
    }

    /// Whether both handles wrap the same function.
    pub fn ptr_eq(&self, other: &Handler) -> bool {
        Arc::ptr_eq(&self.call, &other.call)
    }
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handler")
            .field("signature", &self.signature)
            .finish_non_exhaustive()
    }
}
