//! Errors that abort a test run. Assertion mismatches are not errors, they
//! are collected as [`crate::Failure`] values instead.

use std::io;

use thiserror::Error;

/// Boxed error returned by body generators and handler services.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Harness-fatal conditions. Any of these stops the current test before the
/// remaining response checks run.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),

    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),

    #[error("failed to generate test certificate: {0}")]
    Certificate(#[from] rcgen::Error),

    #[error("invalid tls server name {0:?}")]
    InvalidServerName(String),

    /// A value could not be marshalled to JSON.
    #[error("failed to encode {type_name} as json: {message}")]
    Encode { type_name: String, message: String },

    /// A declared return value could not be turned back into the type the
    /// mock wrapper asked for.
    #[error("failed to decode return value: {0}")]
    Decode(String),

    /// An [`crate::OperationRef`] points outside the declared operations.
    #[error("invalid reference: {0}")]
    InvalidReference(String),

    #[error("failed to build request: {0}")]
    Request(#[from] http::Error),

    /// The request URI is not an absolute URL.
    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),

    #[error("failed to execute request: {0}")]
    Http(#[from] hyper::Error),

    #[error("redirect error: {0}")]
    Redirect(String),

    #[error("failed to build request body: {0}")]
    BodyGenerator(BoxError),

    #[error("invalid header pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// Returned to the mock wrapper when a call matches no live expectation.
    #[error("unexpected call {method}({arguments})")]
    UnexpectedCall { method: String, arguments: String },
}
