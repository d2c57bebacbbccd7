//! Values that flow through declared operations. A [`Value`] remembers both
//! its JSON encoding and the Rust type it was built from: the type drives
//! "any value of that type" argument matching, the JSON is what ends up in
//! request and response bodies.

use std::{any, borrow::Cow, fmt};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value as Json;

use crate::Error;

/// Type name given to [`Value::nil`].
pub const NIL: &str = "nil";

/// Type name given to [`Value::error`].
pub const ERROR: &str = "error";

/// A typed, JSON encodable value. Anything that implements [`Serialize`]
/// converts into a [`Value`] with [`From`].
#[derive(Clone, PartialEq)]
pub struct Value {
    type_name: Cow<'static, str>,
    json: Result<Json, String>,
}

impl Value {
    /// Encodes `value`. Encoding failures are kept and reported as
    /// [`Error::Encode`] when the value is actually needed.
    pub fn of<T: Serialize + ?Sized>(value: &T) -> Self {
        Self {
            type_name: Cow::Borrowed(type_name::<T>()),
            json: serde_json::to_value(value).map_err(|err| err.to_string()),
        }
    }

    /// Absent value, encodes as `null`.
    pub fn nil() -> Self {
        Self {
            type_name: Cow::Borrowed(NIL),
            json: Ok(Json::Null),
        }
    }

    /// Error return value. Encodes as the message string.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            type_name: Cow::Borrowed(ERROR),
            json: Ok(Json::String(message.into())),
        }
    }

    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    pub fn is_nil(&self) -> bool {
        matches!(self.json, Ok(Json::Null))
    }

    pub fn to_json(&self) -> crate::Result<&Json> {
        self.json.as_ref().map_err(|message| Error::Encode {
            type_name: self.type_name.to_string(),
            message: message.clone(),
        })
    }

    /// Serialized JSON bytes, the form used for bodies.
    pub fn encode(&self) -> crate::Result<Vec<u8>> {
        serde_json::to_vec(self.to_json()?).map_err(|err| Error::Encode {
            type_name: self.type_name.to_string(),
            message: err.to_string(),
        })
    }

    pub fn decode<T: DeserializeOwned>(&self) -> crate::Result<T> {
        serde_json::from_value(self.to_json()?.clone()).map_err(|err| {
            Error::Decode(format!(
                "{} as {}: {err}",
                self.type_name,
                any::type_name::<T>()
            ))
        })
    }
}

impl<T: Serialize> From<T> for Value {
    fn from(value: T) -> Self {
        Value::of(&value)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.json {
            Ok(json) => write!(f, "{}({json})", self.type_name),
            Err(err) => write!(f, "{}(<unencodable: {err}>)", self.type_name),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.json {
            Ok(json) => write!(f, "{json}"),
            Err(_) => write!(f, "<{}>", self.type_name),
        }
    }
}

/// [`any::type_name`] without leading references, so `&User`, `&mut User`
/// and `User` all count as the same type for matching.
pub fn type_name<T: ?Sized>() -> &'static str {
    let mut name = any::type_name::<T>();

    loop {
        if let Some(rest) = name.strip_prefix("&mut ") {
            name = rest;
        } else if let Some(rest) = name.strip_prefix('&') {
            name = rest;
        } else {
            return name;
        }
    }
}

/// Values handed back by a mocked method, in declaration order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Returns(Vec<Value>);

impl Returns {
    pub fn new(values: Vec<Value>) -> Self {
        Self(values)
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Value> {
        self.0.iter()
    }

    /// Decodes the value at `index` into `T`.
    pub fn decode<T: DeserializeOwned>(&self, index: usize) -> crate::Result<T> {
        self.value(index)?.decode()
    }

    /// `true` if the value at `index` is missing or nil.
    pub fn is_nil(&self, index: usize) -> bool {
        self.get(index).map_or(true, Value::is_nil)
    }

    /// Error message at `index`, or `None` when that return is nil.
    pub fn error(&self, index: usize) -> Option<String> {
        let value = self.get(index).filter(|value| !value.is_nil())?;

        match value.to_json() {
            Ok(Json::String(message)) => Some(message.clone()),
            _ => Some(value.to_string()),
        }
    }

    fn value(&self, index: usize) -> crate::Result<&Value> {
        self.get(index).ok_or_else(|| {
            Error::Decode(format!(
                "no return value at position {index}, only {} declared",
                self.len()
            ))
        })
    }
}

impl From<Vec<Value>> for Returns {
    fn from(values: Vec<Value>) -> Self {
        Self(values)
    }
}

impl IntoIterator for Returns {
    type Item = Value;
    type IntoIter = std::vec::IntoIter<Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Builds [`Returns`] from anything convertible into [`Value`].
///
/// ```
/// use litmus::{returns, Value};
///
/// let returns = returns![Value::nil(), Value::error("conflict")];
/// assert_eq!(returns.error(1).as_deref(), Some("conflict"));
/// ```
#[macro_export]
macro_rules! returns {
    ($($value:expr),* $(,)?) => {
        $crate::Returns::new(vec![$($crate::Value::from($value)),*])
    };
}

/// Builds the argument list a mock wrapper passes to
/// [`crate::MockBackend::method_called`].
#[macro_export]
macro_rules! values {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::Value::from($value)),*]
    };
}

#[cfg(test)]
mod tests {
    use serde::Deserialize;

    use super::*;

    #[derive(Serialize, Deserialize, Debug, PartialEq)]
    struct User {
        id: u64,
        name: String,
    }

    #[test]
    fn references_share_type_name() {
        let user = User {
            id: 1,
            name: String::from("a"),
        };

        assert_eq!(Value::from(&user).type_name(), Value::of(&user).type_name());
        assert_eq!(Value::from(&&user).type_name(), type_name::<User>());
        assert_eq!(Value::from("a").type_name(), "str");
    }

    #[test]
    fn decode_returns() {
        let returns = returns![
            User {
                id: 1,
                name: String::from("a")
            },
            Value::nil()
        ];

        let user: User = returns.decode(0).unwrap();

        assert_eq!(user.id, 1);
        assert!(returns.is_nil(1));
        assert!(returns.is_nil(2));
        assert_eq!(returns.error(1), None);
        assert!(matches!(returns.decode::<User>(5), Err(Error::Decode(_))));
    }

    #[test]
    fn error_returns() {
        let returns = returns![Value::nil(), Value::error("conflict")];

        assert_eq!(returns.error(1).as_deref(), Some("conflict"));
        assert_eq!(returns.get(1).unwrap().type_name(), ERROR);
    }

    #[test]
    fn unencodable_value() {
        use std::collections::HashMap;

        let mut map = HashMap::new();
        map.insert((1, 2), "tuple keys are not valid json");

        let value = Value::from(map);

        assert!(matches!(value.encode(), Err(Error::Encode { .. })));
    }
}
