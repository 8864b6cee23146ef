//! Response bodies and the streaming hand-off.
//!
//! A body is either a list of chunks known up front or a producer that emits
//! chunks through a [`BodyWriter`]. Streaming is a single-slot, acknowledged
//! hand-off: `write` returns only after the consumer has written the chunk out
//! and asked for the next one, so at most one chunk is ever in flight.
//!
//! The consumer drives the exchange. The producer future is owned by
//! [`Chunks`] and only makes progress while [`Chunks::next`] is awaited, which
//! keeps the whole exchange inside the connection's own task.

use std::fmt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;

use bytes::Bytes;
use futures_util::FutureExt;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use crate::http::connection::panic_message;

type Producer = Pin<Box<dyn Future<Output = anyhow::Result<()>> + Send>>;
type CloseHook = Box<dyn FnOnce() + Send>;
type Handoff = (Bytes, oneshot::Sender<()>);

/// The consumer went away before the chunk was taken, typically because the
/// client connection failed.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("response stream closed by the consumer")]
pub struct StreamClosed;

/// Body of a response.
pub enum Body {
    /// Chunks known before writing starts.
    Full(Vec<Bytes>),
    /// Chunks produced incrementally while the response is written.
    Stream(StreamBody),
}

impl Body {
    pub fn empty() -> Self {
        Body::Full(Vec::new())
    }

    /// A body made of a single chunk.
    pub fn full(chunk: impl Into<Bytes>) -> Self {
        Body::Full(vec![chunk.into()])
    }

    /// A body whose chunks are emitted by `producer`.
    pub fn stream<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(BodyWriter) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Body::Stream(StreamBody::new(producer))
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, Body::Stream(_))
    }

    /// Turns the body into the consumer side of the exchange.
    ///
    /// For a streaming body this is where the producer is started.
    pub fn into_chunks(self) -> Chunks {
        match self {
            Body::Full(chunks) => Chunks {
                source: Source::Full(chunks.into_iter()),
                on_close: None,
            },
            Body::Stream(stream) => {
                let (tx, rx) = mpsc::channel(1);
                let producer = (stream.producer)(BodyWriter { tx });
                Chunks {
                    source: Source::Stream {
                        rx,
                        producer: Some(producer),
                        pending_ack: None,
                    },
                    on_close: stream.on_close,
                }
            }
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Body::empty()
    }
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Full(chunks) => f.debug_tuple("Full").field(chunks).finish(),
            Body::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<&'static str> for Body {
    fn from(s: &'static str) -> Self {
        Body::full(s)
    }
}

impl From<String> for Body {
    fn from(s: String) -> Self {
        Body::full(s)
    }
}

impl From<Vec<u8>> for Body {
    fn from(v: Vec<u8>) -> Self {
        Body::full(v)
    }
}

impl From<Bytes> for Body {
    fn from(b: Bytes) -> Self {
        Body::full(b)
    }
}

/// A producer waiting to be started, plus an optional close hook.
pub struct StreamBody {
    producer: Box<dyn FnOnce(BodyWriter) -> Producer + Send>,
    on_close: Option<CloseHook>,
}

impl StreamBody {
    pub fn new<F, Fut>(producer: F) -> Self
    where
        F: FnOnce(BodyWriter) -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            producer: Box::new(move |writer| Box::pin(guarded(producer(writer))) as Producer),
            on_close: None,
        }
    }

    /// Registers a hook that runs once the response has been written, whether
    /// or not writing succeeded, including when the producer panics.
    pub fn on_close(mut self, hook: impl FnOnce() + Send + 'static) -> Self {
        self.on_close = Some(Box::new(hook));
        self
    }
}

/// Turns a panic inside the producer into an error for the consumer.
async fn guarded<Fut>(producer: Fut) -> anyhow::Result<()>
where
    Fut: Future<Output = anyhow::Result<()>>,
{
    match AssertUnwindSafe(producer).catch_unwind().await {
        Ok(result) => result,
        Err(payload) => Err(anyhow::anyhow!(
            "response producer panicked: {}",
            panic_message(payload.as_ref())
        )),
    }
}

/// Producer side of a streaming body.
pub struct BodyWriter {
    tx: mpsc::Sender<Handoff>,
}

impl BodyWriter {
    /// Hands `chunk` to the consumer and waits until it has been written out.
    ///
    /// Returns the chunk's length in bytes.
    pub async fn write(&mut self, chunk: impl Into<Bytes>) -> Result<usize, StreamClosed> {
        let chunk = chunk.into();
        let len = chunk.len();
        let (ack_tx, ack_rx) = oneshot::channel();

        self.tx
            .send((chunk, ack_tx))
            .await
            .map_err(|_| StreamClosed)?;
        ack_rx.await.map_err(|_| StreamClosed)?;

        Ok(len)
    }
}

enum Source {
    Full(std::vec::IntoIter<Bytes>),
    Stream {
        rx: mpsc::Receiver<Handoff>,
        producer: Option<Producer>,
        pending_ack: Option<oneshot::Sender<()>>,
    },
}

enum Event {
    Chunk(Option<Handoff>),
    Produced(anyhow::Result<()>),
}

/// Consumer side of a body: yields chunks in order, one at a time.
pub struct Chunks {
    source: Source,
    on_close: Option<CloseHook>,
}

impl Chunks {
    /// Returns the next chunk, or `None` once the body is complete.
    ///
    /// For a streaming body, calling `next` again is what acknowledges the
    /// previous chunk and lets the producer continue. A producer error is
    /// returned as soon as the producer finishes with it.
    pub async fn next(&mut self) -> anyhow::Result<Option<Bytes>> {
        let (rx, producer, pending_ack) = match &mut self.source {
            Source::Full(chunks) => return Ok(chunks.next()),
            Source::Stream {
                rx,
                producer,
                pending_ack,
            } => (rx, producer, pending_ack),
        };

        if let Some(ack) = pending_ack.take() {
            let _ = ack.send(());
        }

        loop {
            let event = match producer.as_mut() {
                None => Event::Chunk(rx.recv().await),
                Some(running) => tokio::select! {
                    handoff = rx.recv() => Event::Chunk(handoff),
                    result = running => Event::Produced(result),
                },
            };

            match event {
                Event::Produced(result) => {
                    *producer = None;
                    result?;
                }
                Event::Chunk(Some((chunk, ack))) => {
                    *pending_ack = Some(ack);
                    return Ok(Some(chunk));
                }
                Event::Chunk(None) => {
                    // The writer was dropped; the body ends when the producer does.
                    if let Some(running) = producer.take() {
                        running.await?;
                    }
                    return Ok(None);
                }
            }
        }
    }

    /// Drains every remaining chunk into one buffer.
    pub async fn collect(&mut self) -> anyhow::Result<Vec<u8>> {
        let mut buf = Vec::new();
        while let Some(chunk) = self.next().await? {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf)
    }

    /// Runs the body's close hook, if it has one and it has not run yet.
    ///
    /// Dropping `Chunks` runs it too.
    pub fn close(&mut self) {
        if let Some(hook) = self.on_close.take() {
            hook();
        }
    }
}

impl Drop for Chunks {
    fn drop(&mut self) {
        self.close();
    }
}
