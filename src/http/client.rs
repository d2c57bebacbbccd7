//! Minimal HTTP/1.1 client for talking to the test server. Every hop opens
//! its own connection, which is driven by a separate Tokio task until the
//! response has been read.

use std::sync::Arc;

use bytes::Bytes;
use http::{header, request::Parts as RequestParts, response, HeaderValue, Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, Full};
use hyper_util::rt::TokioIo;
use rustls::ClientConfig;
use tokio::{
    io::{AsyncRead, AsyncWrite},
    net::TcpStream,
};
use tokio_rustls::TlsConnector;
use url::Url;

use super::redirect::{Action, Attempt, Redirect};
use crate::{tls, Error};

/// Fully received response.
#[derive(Debug)]
pub(crate) struct Received {
    pub parts: response::Parts,
    pub body: Bytes,
}

pub(crate) struct Client {
    connector: TlsConnector,
    redirect: Redirect,
    max_redirects: usize,
}

impl Client {
    pub fn new(config: Arc<ClientConfig>, redirect: Redirect, max_redirects: usize) -> Self {
        Self {
            connector: TlsConnector::from(config),
            redirect,
            max_redirects,
        }
    }

    /// Sends `request`, whose URI must be absolute, and follows redirects as
    /// the policy allows.
    pub async fn send(&self, request: Request<Bytes>) -> Result<Received, Error> {
        let (mut parts, mut body) = request.into_parts();
        let mut url = Url::parse(&parts.uri.to_string())?;
        let mut previous = Vec::new();

        loop {
            let received = self.send_once(&parts, &url, body.clone()).await?;

            let Some(next) = redirect_target(&received, &url)? else {
                return Ok(received);
            };

            previous.push(url.clone());

            let attempt = Attempt {
                status: received.parts.status,
                next: &next,
                previous: &previous,
            };

            match self.redirect.check(&attempt, self.max_redirects) {
                Action::Stop => return Ok(received),
                Action::Error(message) => return Err(Error::Redirect(message)),
                Action::Follow => {
                    tracing::debug!(from = %url, to = %next, status = %received.parts.status, "Following redirect");
                    rewrite_for_redirect(&mut parts, &mut body, received.parts.status);
                    parts.uri = next.as_str().parse::<Uri>().map_err(|err| Error::Redirect(err.to_string()))?;
                    url = next;
                }
            }
        }
    }

    async fn send_once(&self, parts: &RequestParts, url: &Url, body: Bytes) -> Result<Received, Error> {
        let host = url
            .host_str()
            .ok_or_else(|| Error::Redirect(format!("{url} has no host")))?;
        let port = url
            .port_or_known_default()
            .ok_or_else(|| Error::Redirect(format!("{url} has no port")))?;

        let request = origin_form(parts, url, body)?;
        let stream = TcpStream::connect((host, port)).await?;

        tracing::debug!(method = %request.method(), %url, "Sending request");

        match url.scheme() {
            "https" => {
                let stream = self
                    .connector
                    .connect(tls::server_name(host)?, stream)
                    .await?;
                transmit(stream, request).await
            }
            "http" => transmit(stream, request).await,
            scheme => Err(Error::Redirect(format!("unsupported scheme {scheme}"))),
        }
    }
}

/// Performs one request/response exchange on a fresh connection.
async fn transmit<T>(io: T, request: Request<Full<Bytes>>) -> Result<Received, Error>
where
    T: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (mut sender, conn) = hyper::client::conn::http1::handshake(TokioIo::new(io)).await?;

    tokio::task::spawn(async move {
        if let Err(err) = conn.await {
            tracing::debug!(%err, "Client connection failed");
        }
    });

    let (parts, body) = sender.send_request(request).await?.into_parts();
    let body = body.collect().await?.to_bytes();

    Ok(Received { parts, body })
}

/// Rebuilds the request with an origin-form target and a `Host` header,
/// which is what a client talking directly to the server sends.
fn origin_form(parts: &RequestParts, url: &Url, body: Bytes) -> Result<Request<Full<Bytes>>, Error> {
    let mut target = String::from(url.path());
    if let Some(query) = url.query() {
        target.push('?');
        target.push_str(query);
    }

    let mut request = Request::builder()
        .method(parts.method.clone())
        .uri(target)
        .version(parts.version)
        .body(Full::new(body))?;

    *request.headers_mut() = parts.headers.clone();

    if !request.headers().contains_key(header::HOST) {
        let host = match url.port() {
            Some(port) => format!("{}:{port}", url.host_str().unwrap_or_default()),
            None => String::from(url.host_str().unwrap_or_default()),
        };
        let host = HeaderValue::from_str(&host).map_err(http::Error::from)?;
        request.headers_mut().insert(header::HOST, host);
    }

    Ok(request)
}

/// Absolute URL of the `Location` header if the response is a redirect the
/// client knows how to follow.
fn redirect_target(received: &Received, base: &Url) -> Result<Option<Url>, Error> {
    let followable = matches!(
        received.parts.status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    );

    if !followable {
        return Ok(None);
    }

    let Some(location) = received.parts.headers.get(header::LOCATION) else {
        return Ok(None);
    };

    let location = location
        .to_str()
        .map_err(|err| Error::Redirect(err.to_string()))?;

    let next = base
        .join(location)
        .map_err(|err| Error::Redirect(format!("invalid location {location:?}: {err}")))?;

    Ok(Some(next))
}

/// `301`, `302` and `303` turn into a `GET` without body, `307` and `308`
/// keep the method and body.
fn rewrite_for_redirect(parts: &mut RequestParts, body: &mut Bytes, status: StatusCode) {
    let keep = matches!(
        status,
        StatusCode::TEMPORARY_REDIRECT | StatusCode::PERMANENT_REDIRECT
    );

    if !keep && parts.method != Method::HEAD {
        parts.method = Method::GET;
        *body = Bytes::new();
        parts.headers.remove(header::CONTENT_TYPE);
        parts.headers.remove(header::CONTENT_LENGTH);
    }

    parts.headers.remove(header::HOST);
}
