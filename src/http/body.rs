//! Body sources of test requests and expected responses, plus utilities for
//! creating common bodies in handlers under test.

use std::{convert::Infallible, fmt, sync::Arc};

use bytes::Bytes;
use http_body_util::{combinators::BoxBody, BodyExt, Empty, Full};
use serde::Serialize;

use crate::{error::BoxError, MockBackend, OperationRef, Test, Value};

/// Produces a request body at run time from the backend and the test.
pub type BodyGenerator =
    Arc<dyn Fn(&MockBackend, &Test) -> Result<Bytes, BoxError> + Send + Sync>;

/// Where the request body comes from.
#[derive(Clone, Default)]
pub enum RequestBody {
    /// No body at all.
    #[default]
    Empty,

    /// Sent verbatim.
    Bytes(Bytes),

    /// Sent verbatim.
    Text(String),

    /// The referenced operation argument, encoded as JSON.
    Ref(OperationRef),

    /// Built by a function right before the request is sent.
    Generator(BodyGenerator),

    /// Any other value, encoded as JSON.
    Json(Value),
}

impl RequestBody {
    pub fn json(value: impl Into<Value>) -> Self {
        RequestBody::Json(value.into())
    }

    pub fn generate<F>(generator: F) -> Self
    where
        F: Fn(&MockBackend, &Test) -> Result<Bytes, BoxError> + Send + Sync + 'static,
    {
        RequestBody::Generator(Arc::new(generator))
    }
}

impl fmt::Debug for RequestBody {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestBody::Empty => write!(f, "Empty"),
            RequestBody::Bytes(bytes) => f.debug_tuple("Bytes").field(bytes).finish(),
            RequestBody::Text(text) => f.debug_tuple("Text").field(text).finish(),
            RequestBody::Ref(reference) => f.debug_tuple("Ref").field(reference).finish(),
            RequestBody::Generator(_) => write!(f, "Generator"),
            RequestBody::Json(value) => f.debug_tuple("Json").field(value).finish(),
        }
    }
}

/// What the response body is compared against.
#[derive(Clone, Debug, Default)]
pub enum ExpectedBody {
    /// Don't look at the body.
    #[default]
    Skip,

    Bytes(Bytes),

    Text(String),

    /// The referenced operation return value, encoded as JSON.
    Ref(OperationRef),

    /// Any other value, encoded as JSON.
    Json(Value),
}

impl ExpectedBody {
    pub fn json(value: impl Into<Value>) -> Self {
        ExpectedBody::Json(value.into())
    }
}

macro_rules! impl_body_from {
    ($($body:ident),*) => {$(
        impl From<&'static str> for $body {
            fn from(text: &'static str) -> Self {
                $body::Text(String::from(text))
            }
        }

        impl From<String> for $body {
            fn from(text: String) -> Self {
                $body::Text(text)
            }
        }

        impl From<Bytes> for $body {
            fn from(bytes: Bytes) -> Self {
                $body::Bytes(bytes)
            }
        }

        impl From<Vec<u8>> for $body {
            fn from(bytes: Vec<u8>) -> Self {
                $body::Bytes(Bytes::from(bytes))
            }
        }

        impl From<&'static [u8]> for $body {
            fn from(bytes: &'static [u8]) -> Self {
                $body::Bytes(Bytes::from_static(bytes))
            }
        }

        impl From<OperationRef> for $body {
            fn from(reference: OperationRef) -> Self {
                $body::Ref(reference)
            }
        }

        impl From<Value> for $body {
            fn from(value: Value) -> Self {
                $body::Json(value)
            }
        }
    )*};
}

impl_body_from!(RequestBody, ExpectedBody);

/// Single chunk body.
pub fn full<T: Into<Bytes>>(chunk: T) -> BoxBody<Bytes, Infallible> {
    Full::new(chunk.into()).boxed()
}

pub fn empty() -> BoxBody<Bytes, Infallible> {
    Empty::<Bytes>::new().boxed()
}

/// JSON encoded body. Falls back to `null` if `value` can't be encoded.
pub fn json<T: Serialize + ?Sized>(value: &T) -> BoxBody<Bytes, Infallible> {
    match serde_json::to_vec(value) {
        Ok(encoded) => full(encoded),
        Err(err) => {
            tracing::warn!(%err, "Failed to encode response body");
            full("null")
        }
    }
}
