use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tracing::{debug, error, warn};

use crate::app::Application;
use crate::http::env::Environment;
use crate::http::parser::{ParseError, parse_request};
use crate::http::response::Response;
use crate::http::writer::ResponseWriter;

/// Handles exactly one request on one connection, then closes it.
pub struct Connection<S> {
    stream: BufReader<S>,
    peer: Option<SocketAddr>,
    app: Arc<dyn Application>,
    state: ConnectionState,
}

pub enum ConnectionState {
    Parsing,
    Dispatching(Environment),
    Writing(Response),
    Closed,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, app: Arc<dyn Application>) -> Self {
        Self {
            stream: BufReader::new(stream),
            peer: None,
            app,
            state: ConnectionState::Parsing,
        }
    }

    /// Tags log lines with the remote address.
    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Drives the connection to `Closed`.
    ///
    /// Application failures are answered with a 500 and malformed requests
    /// with a best-effort 400. Read and write failures end the connection and
    /// are returned. The stream is shut down and dropped on every path.
    pub async fn run(mut self) -> anyhow::Result<()> {
        let result = self.step_until_closed().await;

        let _ = self.stream.get_mut().shutdown().await;
        result
    }

    async fn step_until_closed(&mut self) -> anyhow::Result<()> {
        loop {
            match std::mem::replace(&mut self.state, ConnectionState::Closed) {
                ConnectionState::Parsing => {
                    self.state = match parse_request(&mut self.stream).await {
                        Ok(request) => {
                            debug!(
                                peer = ?self.peer,
                                method = %request.method,
                                target = %request.target,
                                "Request received"
                            );
                            ConnectionState::Dispatching(Environment::from_request(request))
                        }
                        Err(ParseError::ConnectionClosed) => {
                            debug!(peer = ?self.peer, "Peer closed before sending a request");
                            ConnectionState::Closed
                        }
                        Err(e) if e.is_malformed() => {
                            warn!(peer = ?self.peer, error = %e, "Malformed request");
                            ConnectionState::Writing(Response::bad_request())
                        }
                        Err(e) => return Err(e.into()),
                    };
                }

                ConnectionState::Dispatching(env) => {
                    let response = dispatch(Arc::clone(&self.app), env).await;
                    self.state = ConnectionState::Writing(response);
                }

                ConnectionState::Writing(response) => {
                    let status = response.status;
                    let mut writer = ResponseWriter::new(self.stream.get_mut());
                    writer.write(response).await?;

                    debug!(
                        peer = ?self.peer,
                        status,
                        bytes = writer.bytes_written(),
                        "Response written"
                    );
                }

                ConnectionState::Closed => {
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Calls the application, turning an error or a panic into the fixed 500.
///
/// `call` is synchronous and may block, so it runs on the blocking pool and
/// the connection's task only awaits its result.
pub async fn dispatch(app: Arc<dyn Application>, env: Environment) -> Response {
    let method = env.method().to_string();
    let path = env.path().to_string();

    match tokio::task::spawn_blocking(move || app.call(env)).await {
        Ok(Ok(response)) => response,
        Ok(Err(e)) => {
            error!(%method, %path, "Application error: {:?}", e);
            Response::internal_error()
        }
        Err(e) if e.is_panic() => {
            let payload = e.into_panic();
            error!(%method, %path, "Application panicked: {}", panic_message(payload.as_ref()));
            Response::internal_error()
        }
        Err(e) => {
            error!(%method, %path, "Application task failed: {}", e);
            Response::internal_error()
        }
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        *s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}
