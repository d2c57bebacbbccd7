//! Request query parameters.

use std::collections::BTreeMap;

use url::form_urlencoded;

/// Query parameters of a test request. Keys are kept sorted, values keep
/// the order they were added in.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Query(BTreeMap<String, Vec<String>>);

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.entry(key.into()).or_default().push(value.into());
    }

    /// First value of `key`.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key)?.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// `application/x-www-form-urlencoded` form, sorted by key.
    pub fn encode(&self) -> String {
        let pairs = self
            .0
            .iter()
            .flat_map(|(key, values)| values.iter().map(move |value| (key, value)));

        form_urlencoded::Serializer::new(String::new())
            .extend_pairs(pairs)
            .finish()
    }
}

/// Fluent builder started by [`begin_query`].
#[derive(Clone, Debug, Default)]
pub struct QueryBuilder(Query);

impl QueryBuilder {
    pub fn add(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.add(key, value);
        self
    }

    pub fn end_query(self) -> Query {
        self.0
    }

    pub fn encode(&self) -> String {
        self.0.encode()
    }
}

/// Starts a query: `begin_query().add("page", "2").end_query()`.
pub fn begin_query() -> QueryBuilder {
    QueryBuilder::default()
}
