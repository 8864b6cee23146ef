use std::future::Future;
use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpSocket, TcpStream, lookup_host};
use tracing::{error, info};

use crate::app::Application;
use crate::config::Config;
use crate::http::connection::Connection;

/// Pause after a failed `accept` before trying again.
pub const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// A source of incoming connections.
pub trait Accept {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send + 'static;

    fn accept(&self) -> impl Future<Output = io::Result<(Self::Stream, SocketAddr)>> + Send;
}

impl Accept for TcpListener {
    type Stream = TcpStream;

    fn accept(&self) -> impl Future<Output = io::Result<(TcpStream, SocketAddr)>> + Send {
        TcpListener::accept(self)
    }
}

/// The bound, listening socket.
pub struct Listener {
    listener: TcpListener,
}

impl Listener {
    /// Binds with `SO_REUSEADDR` and starts listening with the configured
    /// backlog.
    pub async fn bind(cfg: &Config) -> anyhow::Result<Self> {
        let listen_addr = cfg.listen_addr();
        let addr = lookup_host(&listen_addr)
            .await
            .with_context(|| format!("cannot resolve {}", listen_addr))?
            .next()
            .with_context(|| format!("no address for {}", listen_addr))?;

        let socket = if addr.is_ipv4() {
            TcpSocket::new_v4()?
        } else {
            TcpSocket::new_v6()?
        };
        socket.set_reuseaddr(true)?;
        socket
            .bind(addr)
            .with_context(|| format!("cannot bind {}", addr))?;
        let listener = socket.listen(cfg.backlog)?;

        info!("Listening on {}", listener.local_addr()?);
        Ok(Self { listener })
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts forever, moving each connection into its own task.
    pub async fn serve(self, app: Arc<dyn Application>) -> anyhow::Result<()> {
        serve_on(self.listener, app).await
    }
}

/// Accept loop over any connection source.
///
/// The loop never waits on a connection. A failed `accept` is logged and
/// retried after [`ACCEPT_BACKOFF`].
pub async fn serve_on<A: Accept>(acceptor: A, app: Arc<dyn Application>) -> anyhow::Result<()> {
    loop {
        let (socket, peer) = match acceptor.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                error!("Accept failed: {}", e);
                tokio::time::sleep(ACCEPT_BACKOFF).await;
                continue;
            }
        };
        info!("Accepted connection from {}", peer);

        let app = Arc::clone(&app);
        tokio::spawn(async move {
            let conn = Connection::new(socket, app).with_peer(peer);
            if let Err(e) = conn.run().await {
                error!("Connection error from {}: {:#}", peer, e);
            }
        });
    }
}

pub async fn run(cfg: &Config, app: Arc<dyn Application>) -> anyhow::Result<()> {
    Listener::bind(cfg).await?.serve(app).await
}
