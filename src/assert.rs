//! Response checks. Each one records its own [`Failure`] and lets the others
//! run, only an invalid header pattern stops the test.

use std::collections::BTreeMap;

use bytes::Bytes;
use http::{header, HeaderMap, StatusCode};
use regex::Regex;
use serde_json::Value as Json;

use crate::{http::request::Expected, report::Failure, Error, Outcome};

pub(crate) fn status(expected: StatusCode, actual: StatusCode, outcome: &mut Outcome) {
    if expected != actual {
        outcome.record(Failure::Status { expected, actual });
    }
}

pub(crate) fn content_type(expected: Option<&str>, headers: &HeaderMap, outcome: &mut Outcome) {
    let Some(expected) = expected else {
        return;
    };

    let actual = header_value(headers, header::CONTENT_TYPE.as_str());

    if actual.as_deref() != Some(expected) {
        outcome.record(Failure::ContentType {
            expected: String::from(expected),
            actual,
        });
    }
}

/// Every pattern must match the first value of its header. A missing header
/// is matched as an empty string.
pub(crate) fn headers(
    expected: &BTreeMap<String, String>,
    headers: &HeaderMap,
    outcome: &mut Outcome,
) -> Result<(), Error> {
    for (name, pattern) in expected {
        let regex = Regex::new(pattern)?;
        let actual = header_value(headers, name);

        if !regex.is_match(actual.as_deref().unwrap_or_default()) {
            outcome.record(Failure::Header {
                name: name.clone(),
                pattern: pattern.clone(),
                actual,
            });
        }
    }

    Ok(())
}

/// Compares the received body with the expected one. Nothing is checked
/// when no body is expected.
pub(crate) fn body(expected: Option<&Expected>, actual: &Bytes, outcome: &mut Outcome) {
    let Some(expected) = expected else {
        return;
    };

    if actual.is_empty() {
        if !expected.as_bytes().is_empty() {
            outcome.record(Failure::EmptyBody {
                expected: expected.to_text(),
            });
        }
        return;
    }

    let equal = match expected {
        Expected::Json(bytes) => json_eq(bytes, actual).unwrap_or(false),
        Expected::Raw(bytes) => json_eq(bytes, actual).unwrap_or_else(|| bytes == actual),
    };

    if !equal {
        outcome.record(Failure::Body {
            expected: expected.to_text(),
            actual: String::from_utf8_lossy(actual).into_owned(),
        });
    }
}

/// Structural JSON equality, `None` if either side is not JSON.
fn json_eq(expected: &[u8], actual: &[u8]) -> Option<bool> {
    let expected: Json = serde_json::from_slice(expected).ok()?;
    let actual: Json = serde_json::from_slice(actual).ok()?;

    Some(expected == actual)
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}
