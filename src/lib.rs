//! Declarative tests for HTTP handlers backed by mocked dependencies.
//!
//! A [`Test`] describes one exchange: the request to send, the response to
//! expect and the [`Operation`]s the handler should perform on its backend.
//! Running it starts the handler on an ephemeral TLS server, sends the
//! request, checks the response and verifies the [`MockBackend`].

mod assert;
mod config;
mod error;
mod operation;
mod query;
mod report;
mod server;
mod tls;
mod value;

pub mod http;
pub mod mock;

pub use config::Config;
pub use error::{BoxError, Error, Result};
pub use self::http::{
    body::{empty, full, json, BodyGenerator, ExpectedBody, RequestBody},
    redirect::{Action, Attempt, Redirect},
};
pub use mock::{backend::MockBackend, Call, Matcher, Mock};
pub use operation::{operation_arg, operation_return, Arg, Operation, OperationRef, Target};
pub use query::{begin_query, Query, QueryBuilder};
pub use report::{Failure, Outcome};
pub use server::TestServer;
pub use test::{Setup, Test};
pub use value::{type_name, Returns, Value};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
