//! Serde helpers for fields of [`super::Config`].

use serde::{Deserialize, Deserializer};

/// Either a bare value or a list of them.
#[derive(Deserialize)]
#[serde(untagged)]
enum Names<T> {
    Single(T),
    List(Vec<T>),
}

/// Lets `server_name` take a single name for the common case where the
/// certificate only needs one:
///
/// ```toml
/// server_name = "api.test"
/// server_name = ["api.test", "localhost"]
/// ```
///
/// Both forms end up as a list, the first entry being the name the client
/// dials.
pub(super) fn one_or_many<'de, T, D>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Ok(match Names::deserialize(deserializer)? {
        Names::Single(name) => vec![name],
        Names::List(names) => names,
    })
}
