//! Ephemeral TLS server wrapping the handler under test.
//!
//! ```text
//!   Test ──request──> TcpListener ──TLS──> hyper http1 ──> Handler
//!     ^                    |
//!     |               JoinSet of
//!     └───response─── connection tasks
//! ```
//!
//! The accept loop and every connection task it spawns are aborted when the
//! [`TestServer`] is dropped, so the listening socket and all TLS sessions are
//! released on every exit path of a test, early errors included.

use std::{error::Error as StdError, net::SocketAddr, sync::Arc};

use hyper::{
    body::{Body, Incoming},
    server::conn::http1,
    service::Service,
    Request,
    Response,
};
use hyper_util::rt::TokioIo;
use rustls::ClientConfig;
use tokio::{
    net::{TcpListener, TcpSocket},
    task::{JoinHandle, JoinSet},
};
use tokio_rustls::TlsAcceptor;

use crate::{
    http::{client::Client, redirect::Redirect},
    tls::Identity,
    Config,
    Error,
};

/// TLS server running the handler under test on a background task.
pub struct TestServer {
    /// Socket address the listener is bound to.
    address: SocketAddr,

    /// Host part of [`TestServer::url`], also the name on the certificate.
    server_name: String,

    /// Client side TLS configuration trusting this server's certificate.
    client_config: Arc<ClientConfig>,

    /// Accept loop. Owns the listener and the connection tasks.
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Generates a certificate, binds the configured address and starts
    /// accepting connections. Must be called within a Tokio runtime.
    pub fn start<S, B>(handler: S, config: &Config) -> Result<Self, Error>
    where
        S: Service<Request<Incoming>, Response = Response<B>> + Clone + Send + 'static,
        S::Future: Send + 'static,
        S::Error: Into<Box<dyn StdError + Send + Sync>>,
        B: Body + Send + 'static,
        B::Data: Send,
        B::Error: Into<Box<dyn StdError + Send + Sync>>,
    {
        let identity = Identity::generate(config)?;
        let acceptor = TlsAcceptor::from(identity.server_config()?);

        let socket = if config.listen.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };

        #[cfg(not(windows))]
        socket.set_reuseaddr(true)?;

        socket.bind(config.listen)?;
        let listener = socket.listen(config.backlog)?;

        // If the port is 0 the OS picks one, so ask the listener.
        let address = listener.local_addr()?;

        tracing::debug!(%address, "Test server listening");

        let handle = tokio::task::spawn(accept(listener, acceptor, handler));

        Ok(Self {
            address,
            server_name: String::from(config.server_name()),
            client_config: identity.client_config()?,
            handle,
        })
    }

    pub fn address(&self) -> SocketAddr {
        self.address
    }

    /// Base URL, `https://{server_name}:{port}`.
    pub fn url(&self) -> String {
        format!("https://{}:{}", self.server_name, self.address.port())
    }

    /// Client trusting this server, using the given redirect policy.
    pub(crate) fn client(&self, redirect: Redirect, max_redirects: usize) -> Client {
        Client::new(self.client_config.clone(), redirect, max_redirects)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        tracing::debug!(address = %self.address, "Test server shutting down");
        self.handle.abort();
    }
}

/// Accepts connections until aborted. Each connection gets its own task
/// inside a [`JoinSet`], so dropping this future aborts all of them.
async fn accept<S, B>(listener: TcpListener, acceptor: TlsAcceptor, handler: S)
where
    S: Service<Request<Incoming>, Response = Response<B>> + Clone + Send + 'static,
    S::Future: Send + 'static,
    S::Error: Into<Box<dyn StdError + Send + Sync>>,
    B: Body + Send + 'static,
    B::Data: Send,
    B::Error: Into<Box<dyn StdError + Send + Sync>>,
{
    let mut connections = JoinSet::new();

    loop {
        let (stream, client_addr) = match listener.accept().await {
            Ok(connection) => connection,
            Err(err) => {
                tracing::warn!(%err, "Failed to accept connection");
                continue;
            }
        };

        let acceptor = acceptor.clone();
        let handler = handler.clone();

        connections.spawn(async move {
            let stream = match acceptor.accept(stream).await {
                Ok(stream) => stream,
                Err(err) => {
                    tracing::debug!(%client_addr, %err, "TLS handshake failed");
                    return;
                }
            };

            if let Err(err) = http1::Builder::new()
                .serve_connection(TokioIo::new(stream), handler)
                .await
            {
                tracing::debug!(%client_addr, %err, "Failed to serve connection");
            }
        });
    }
}
