//! Turns a [`Test`] into the request put on the wire and resolves the body it
//! expects back.

use bytes::Bytes;
use http::{header, HeaderValue, Request};

use super::body::{ExpectedBody, RequestBody};
use crate::{Config, Error, MockBackend, Test};

/// Builds the request for `test` against the server at `base`, an URL such
/// as `https://localhost:4433`. The setup hook, if any, runs last.
pub(crate) fn build(
    test: &Test,
    backend: &MockBackend,
    base: &str,
    config: &Config,
) -> Result<Request<Bytes>, Error> {
    let body = resolve_request_body(test, backend)?;

    let mut uri = format!("{base}{}", test.path);
    if !test.query.is_empty() {
        if let Some(start) = uri.find('?') {
            uri.truncate(start);
        }
        uri.push('?');
        uri.push_str(&test.query.encode());
    }

    let content_type = test
        .request_content_type
        .as_deref()
        .unwrap_or(&config.content_type);

    let mut request = Request::builder()
        .method(test.method.clone())
        .uri(uri)
        .body(body)?;

    let content_type = HeaderValue::from_str(content_type).map_err(http::Error::from)?;
    request
        .headers_mut()
        .insert(header::CONTENT_TYPE, content_type);

    if let Some(setup) = &test.setup {
        setup(&mut request);
    }

    Ok(request)
}

/// Request body, resolved in this order: raw bytes, raw text, nothing,
/// operation argument reference, generator, JSON value.
pub(crate) fn resolve_request_body(test: &Test, backend: &MockBackend) -> Result<Bytes, Error> {
    match &test.request {
        RequestBody::Bytes(bytes) => Ok(bytes.clone()),
        RequestBody::Text(text) => Ok(Bytes::from(text.clone())),
        RequestBody::Empty => Ok(Bytes::new()),
        RequestBody::Ref(reference) => Ok(Bytes::from(reference.encode(&test.operations)?)),
        RequestBody::Generator(generate) => generate(backend, test).map_err(Error::BodyGenerator),
        RequestBody::Json(value) => Ok(Bytes::from(value.encode()?)),
    }
}

/// Body the response is compared against.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Expected {
    /// Given verbatim by the test. Compared structurally if both sides are
    /// JSON, byte for byte otherwise.
    Raw(Bytes),

    /// Produced by JSON encoding, always compared structurally.
    Json(Bytes),
}

impl Expected {
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Expected::Raw(bytes) | Expected::Json(bytes) => bytes,
        }
    }

    /// Lossy text form for reports.
    pub fn to_text(&self) -> String {
        String::from_utf8_lossy(self.as_bytes()).into_owned()
    }
}

/// Resolves the expected body, `None` meaning the body is not checked.
pub(crate) fn resolve_expected_body(test: &Test) -> Result<Option<Expected>, Error> {
    let expected = match &test.expected_response {
        ExpectedBody::Bytes(bytes) => Expected::Raw(bytes.clone()),
        ExpectedBody::Text(text) => Expected::Raw(Bytes::from(text.clone())),
        ExpectedBody::Skip => return Ok(None),
        ExpectedBody::Ref(reference) => {
            Expected::Json(Bytes::from(reference.encode(&test.operations)?))
        }
        ExpectedBody::Json(value) => Expected::Json(Bytes::from(value.encode()?)),
    };

    Ok(Some(expected))
}
