//! Handler, mocked dependencies and helpers shared by the integration tests.

pub mod service;
pub mod store;

use litmus::{Config, MockBackend};
use tracing_subscriber::EnvFilter;

use self::{service::UsersService, store::MockUserStore};

/// Logs go through the test writer, run with `RUST_LOG=litmus=debug` to see
/// what the harness is doing.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Users service wired to a mock store recording on `backend`.
pub fn users(backend: &MockBackend) -> UsersService {
    init_tracing();
    UsersService::new(MockUserStore::new(backend))
}

/// Defaults, ignoring whatever the environment points at.
pub fn config() -> Option<Config> {
    Some(Config::default())
}
