//! Async TCP server using Tokio.
//!
//! Accepts TCP connections and feeds each HTTP/1.1 request on them to an
//! [`App`]. Connections are persistent (keep-alive) unless the client asks
//! otherwise; requests on one connection are handled strictly in order.

use std::net::SocketAddr;

use bytes::BytesMut;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info, warn};

use crate::app::App;
use crate::http::{
    Method, StatusCode,
    request::{BodyFraming, Request, RequestError, decode_chunked},
    response::Response,
};

/// Errors produced by the server.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// Maximum size of a complete HTTP request we will buffer before rejecting it (8 MiB).
const MAX_REQUEST_SIZE: usize = 8 * 1024 * 1024;

/// Initial read buffer capacity per connection.
const INITIAL_BUF_SIZE: usize = 4096;

/// A bound listener, ready to serve an [`App`].
///
/// # Examples
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use taskd::{App, Server, store::JsonFileStore};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let app = App::new(Arc::new(JsonFileStore::new("tasks.json")));
///     Server::bind("127.0.0.1:3000").await?.run(app).await?;
///     Ok(())
/// }
/// ```
pub struct Server {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl Server {
    /// Binds the server to the given TCP address.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Bind`] if the address cannot be bound
    /// (e.g. port already in use, insufficient permissions).
    pub async fn bind(addr: impl AsRef<str>) -> Result<Self, ServerError> {
        let addr = addr.as_ref();
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.to_owned(),
                source: e,
            })?;
        let local_addr = listener.local_addr()?;
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Returns the local address the server is bound to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accepts connections forever, spawning one Tokio task per connection.
    ///
    /// Failed accepts and broken connections are logged and skipped; this
    /// only returns if the process is torn down around it.
    pub async fn run(self, app: App) -> Result<(), ServerError> {
        info!(address = %self.local_addr, "accepting connections");

        loop {
            let (stream, peer_addr) = match self.listener.accept().await {
                Ok(pair) => pair,
                Err(e) => {
                    error!(error = %e, "failed to accept connection");
                    continue;
                }
            };

            debug!(peer = %peer_addr, "connection accepted");
            let app = app.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(stream, peer_addr, app).await {
                    warn!(peer = %peer_addr, error = %e, "connection closed with error");
                }
            });
        }
    }
}

// Writes a final response and reports that the connection must close.
async fn reject(stream: &mut TcpStream, response: Response) -> Result<(), std::io::Error> {
    stream.write_all(&response.keep_alive(false).into_bytes()).await?;
    stream.flush().await
}

/// Serves every request on one TCP connection.
///
/// Bytes accumulate in `buf` until a full request (headers plus a body framed
/// by `Content-Length` or chunked encoding) is present, then that request is
/// handed to the app and its bytes are dropped from the front of the buffer.
async fn handle_connection(
    mut stream: TcpStream,
    peer_addr: SocketAddr,
    app: App,
) -> Result<(), std::io::Error> {
    let mut buf = BytesMut::with_capacity(INITIAL_BUF_SIZE);

    loop {
        // Serve everything already buffered before reading again, so
        // pipelined requests are not left waiting on the socket.
        let parsed = if buf.is_empty() {
            Err(RequestError::Incomplete)
        } else {
            Request::parse(&buf)
        };

        let (mut request, body_offset) = match parsed {
            Ok(pair) => pair,
            Err(RequestError::Incomplete) => {
                if buf.len() > MAX_REQUEST_SIZE {
                    warn!(peer = %peer_addr, "request headers too large, sending 413");
                    return reject(&mut stream, too_large()).await;
                }
                if stream.read_buf(&mut buf).await? == 0 {
                    debug!(peer = %peer_addr, "connection closed by peer");
                    return Ok(());
                }
                continue;
            }
            Err(e) => {
                warn!(peer = %peer_addr, error = %e, "bad request, sending 400");
                return reject(&mut stream, bad_request(&e)).await;
            }
        };

        // The body is a suspend point: keep reading until all of it is here.
        let total_needed = match request.framing() {
            BodyFraming::Length(content_length) => {
                let total_needed = body_offset.saturating_add(content_length);
                if total_needed > MAX_REQUEST_SIZE {
                    warn!(peer = %peer_addr, content_length, "request body too large, sending 413");
                    return reject(&mut stream, too_large()).await;
                }
                if buf.len() < total_needed {
                    if stream.read_buf(&mut buf).await? == 0 {
                        debug!(peer = %peer_addr, "peer closed mid-body");
                        return Ok(());
                    }
                    continue;
                }
                total_needed
            }
            BodyFraming::Chunked => match decode_chunked(&buf[body_offset..]) {
                Ok(Some((body, used))) => {
                    request.set_body(body);
                    body_offset + used
                }
                Ok(None) => {
                    if buf.len() > MAX_REQUEST_SIZE {
                        warn!(peer = %peer_addr, "chunked body too large, sending 413");
                        return reject(&mut stream, too_large()).await;
                    }
                    if stream.read_buf(&mut buf).await? == 0 {
                        debug!(peer = %peer_addr, "peer closed mid-body");
                        return Ok(());
                    }
                    continue;
                }
                Err(e) => {
                    warn!(peer = %peer_addr, error = %e, "bad chunked body, sending 400");
                    return reject(&mut stream, bad_request(&e)).await;
                }
            },
        };

        let keep_alive = request.is_keep_alive();
        let is_head = request.method() == &Method::Head;
        debug!(
            peer = %peer_addr,
            method = %request.method(),
            path = %request.path(),
            "dispatching request"
        );

        let response = app.handle(request).await.keep_alive(keep_alive);
        let wire = if is_head {
            response.into_head_bytes()
        } else {
            response.into_bytes()
        };
        stream.write_all(&wire).await?;
        stream.flush().await?;

        let _ = buf.split_to(total_needed);

        if !keep_alive {
            debug!(peer = %peer_addr, "Connection: close, shutting down");
            return Ok(());
        }
    }
}

fn too_large() -> Response {
    Response::new(StatusCode::PayloadTooLarge).body("Request entity too large")
}

fn bad_request(error: &RequestError) -> Response {
    Response::new(StatusCode::BadRequest).body(format!("Bad Request: {error}"))
}
