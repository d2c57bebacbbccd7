//! Result of a test run. Every assertion is attempted and its mismatch is
//! recorded as a [`Failure`], a fatal [`Error`] stops the run early but the
//! failures found until then and the mock verification are still reported.

use std::fmt;

use http::StatusCode;
use thiserror::Error;

use crate::Error;

/// A single assertion that did not hold.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Failure {
    #[error("expected status {expected}, got {actual}")]
    Status {
        expected: StatusCode,
        actual: StatusCode,
    },

    #[error("expected content-type {expected:?}, got {actual:?}")]
    ContentType {
        expected: String,
        actual: Option<String>,
    },

    #[error("header {name} {actual:?} does not match {pattern:?}")]
    Header {
        name: String,
        pattern: String,
        actual: Option<String>,
    },

    #[error("response body mismatch\nexpected: {expected}\n  actual: {actual}")]
    Body { expected: String, actual: String },

    #[error("expected response body {expected}, got an empty body")]
    EmptyBody { expected: String },

    #[error("{method}({matchers}) {}, called {calls} times", expected_calls(.times))]
    UnmetExpectation {
        method: String,
        matchers: String,
        times: Option<usize>,
        calls: usize,
    },

    #[error("unexpected call {method}({arguments})")]
    UnexpectedCall { method: String, arguments: String },
}

fn expected_calls(times: &Option<usize>) -> String {
    match times {
        Some(times) => format!("expected {times} calls"),
        None => String::from("expected at least one call"),
    }
}

/// Everything a test run found.
#[derive(Debug, Default)]
pub struct Outcome {
    failures: Vec<Failure>,
    fatal: Option<Error>,
}

impl Outcome {
    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    /// Error that stopped the run, if any.
    pub fn fatal(&self) -> Option<&Error> {
        self.fatal.as_ref()
    }

    pub fn passed(&self) -> bool {
        self.failures.is_empty() && self.fatal.is_none()
    }

    /// Panics with the full report unless the run passed.
    #[track_caller]
    pub fn assert_passed(&self) {
        if !self.passed() {
            panic!("{self}");
        }
    }

    pub(crate) fn record(&mut self, failure: Failure) {
        tracing::debug!(%failure, "Assertion failed");
        self.failures.push(failure);
    }

    pub(crate) fn extend(&mut self, failures: impl IntoIterator<Item = Failure>) {
        for failure in failures {
            self.record(failure);
        }
    }

    pub(crate) fn abort(&mut self, error: Error) {
        tracing::debug!(%error, "Test aborted");
        self.fatal = Some(error);
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.passed() {
            return write!(f, "passed");
        }

        if let Some(error) = &self.fatal {
            writeln!(f, "fatal: {error}")?;
        }

        for failure in &self.failures {
            writeln!(f, "failed: {failure}")?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_lists_everything() {
        let mut outcome = Outcome::default();
        assert!(outcome.passed());

        outcome.record(Failure::Status {
            expected: StatusCode::OK,
            actual: StatusCode::NOT_FOUND,
        });
        outcome.extend([Failure::UnmetExpectation {
            method: String::from("GetUser"),
            matchers: String::from("[AnyOfType(u64)]"),
            times: None,
            calls: 0,
        }]);
        outcome.abort(Error::Redirect(String::from("too many redirects")));

        let report = outcome.to_string();

        assert!(!outcome.passed());
        assert!(report.contains("fatal: redirect error: too many redirects"));
        assert!(report.contains("expected status 200 OK, got 404 Not Found"));
        assert!(report.contains("GetUser([AnyOfType(u64)]) expected at least one call, called 0 times"));
    }

    #[test]
    #[should_panic(expected = "expected status")]
    fn assert_passed_panics() {
        let mut outcome = Outcome::default();
        outcome.record(Failure::Status {
            expected: StatusCode::CREATED,
            actual: StatusCode::OK,
        });
        outcome.assert_passed();
    }
}
