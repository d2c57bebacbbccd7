//! Harness settings. Every option has a sensible default, so most suites
//! never write a config file, but the ones that do can point the
//! [`Config::ENV`] variable at a TOML file like this one:
//!
//! ```toml
//! listen = "127.0.0.1:0"
//! backlog = 128
//! server_name = ["localhost", "api.test"]
//! content_type = "application/json"
//! max_redirects = 5
//! ```

mod deser;

use std::{net::SocketAddr, path::Path};

use deser::one_or_many;
use serde::{Deserialize, Serialize};

/// Options used when starting the TLS test server and building requests.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address where the test server listens. Port 0 lets the OS pick a free
    /// port, which is what parallel tests want.
    #[serde(default = "default::listen")]
    pub listen: SocketAddr,

    /// Listen backlog of the test server socket.
    #[serde(default = "default::backlog")]
    pub backlog: u32,

    /// Names written into the self-signed certificate. The first one is also
    /// the name the client dials and verifies. Can be a single string.
    #[serde(
        rename = "server_name",
        default = "default::server_names",
        deserialize_with = "one_or_many"
    )]
    pub server_names: Vec<String>,

    /// Request `Content-Type` used when a test doesn't set one.
    #[serde(default = "default::content_type")]
    pub content_type: String,

    /// Redirect limit for [`crate::Redirect::Follow`].
    #[serde(default = "default::max_redirects")]
    pub max_redirects: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen: default::listen(),
            backlog: default::backlog(),
            server_names: default::server_names(),
            content_type: default::content_type(),
            max_redirects: default::max_redirects(),
        }
    }
}

impl Config {
    /// Environment variable holding the path of a TOML config file.
    pub const ENV: &'static str = "LITMUS_CONFIG";

    pub fn from_toml(source: &str) -> crate::Result<Self> {
        Ok(toml::from_str(source)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> crate::Result<Self> {
        Self::from_toml(&std::fs::read_to_string(path)?)
    }

    /// Loads the file named by [`Config::ENV`], or returns the defaults when
    /// the variable is not set.
    pub fn load() -> crate::Result<Self> {
        match std::env::var_os(Self::ENV) {
            Some(path) => {
                tracing::debug!(path = ?path, "Loading harness config");
                Self::from_file(path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Name used for SNI and certificate verification.
    pub fn server_name(&self) -> &str {
        self.server_names
            .first()
            .map(String::as_str)
            .unwrap_or(default::SERVER_NAME)
    }
}

mod default {
    //! Default values for configuration options.

    use std::net::{Ipv4Addr, SocketAddr};

    pub const SERVER_NAME: &str = "localhost";

    pub fn listen() -> SocketAddr {
        SocketAddr::from((Ipv4Addr::LOCALHOST, 0))
    }

    pub fn backlog() -> u32 {
        1024
    }

    pub fn server_names() -> Vec<String> {
        vec![String::from(SERVER_NAME)]
    }

    pub fn content_type() -> String {
        String::from("application/json")
    }

    pub fn max_redirects() -> usize {
        10
    }
}
