use std::io::Write as _;

use anyhow::Context;
use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::body::Chunks;
use crate::http::response::Response;
use crate::http::status::reason_phrase;

const HTTP_VERSION: &str = "HTTP/1.1";

/// Status line plus the application's headers, without the blank line.
fn serialize_head(resp: &Response) -> Vec<u8> {
    let mut buf = Vec::with_capacity(256);

    // Status line
    let _ = write!(
        buf,
        "{} {} {}\r\n",
        HTTP_VERSION,
        resp.status,
        reason_phrase(resp.status)
    );

    // Headers, as supplied
    for (k, v) in &resp.headers {
        buf.extend_from_slice(k.as_bytes());
        buf.extend_from_slice(b": ");
        buf.extend_from_slice(v.as_bytes());
        buf.extend_from_slice(b"\r\n");
    }

    buf
}

/// Serializes one response onto a stream.
///
/// Buffered mode materializes the body and frames it with `Content-Length`
/// and `Connection: Close`. Chunked mode frames every non-empty chunk as it
/// arrives and ends with the zero-length chunk; empty chunks are skipped
/// because on the wire they would end the body.
pub struct ResponseWriter<'a, W> {
    stream: &'a mut W,
    written: usize,
}

impl<'a, W> ResponseWriter<'a, W>
where
    W: AsyncWrite + Unpin,
{
    pub fn new(stream: &'a mut W) -> Self {
        Self { stream, written: 0 }
    }

    /// Bytes handed to the stream so far.
    pub fn bytes_written(&self) -> usize {
        self.written
    }

    /// Writes `response` and runs the body's close hook, on success or failure.
    pub async fn write(&mut self, response: Response) -> anyhow::Result<()> {
        let chunked = response.is_chunked();
        let head = serialize_head(&response);
        let mut chunks = response.body.into_chunks();

        let result = if chunked {
            self.write_chunked(head, &mut chunks).await
        } else {
            self.write_buffered(head, &mut chunks).await
        };

        chunks.close();
        result
    }

    async fn write_buffered(&mut self, mut head: Vec<u8>, chunks: &mut Chunks) -> anyhow::Result<()> {
        let body = chunks.collect().await.context("response body failed")?;

        let _ = write!(head, "Content-Length: {}\r\n", body.len());
        head.extend_from_slice(b"Connection: Close\r\n");
        head.extend_from_slice(b"\r\n");

        self.write_all(&head).await?;
        self.write_all(&body).await?;
        self.stream.flush().await?;

        Ok(())
    }

    async fn write_chunked(&mut self, mut head: Vec<u8>, chunks: &mut Chunks) -> anyhow::Result<()> {
        head.extend_from_slice(b"\r\n");
        self.write_all(&head).await?;
        self.stream.flush().await?;

        while let Some(chunk) = chunks.next().await.context("response body failed")? {
            if chunk.is_empty() {
                continue;
            }

            let mut frame = Vec::with_capacity(chunk.len() + 12);
            let _ = write!(frame, "{:x}\r\n", chunk.len());
            frame.extend_from_slice(&chunk);
            frame.extend_from_slice(b"\r\n");

            self.write_all(&frame).await?;
            self.stream.flush().await?;
        }

        self.write_all(b"0\r\n\r\n").await?;
        self.stream.flush().await?;

        Ok(())
    }

    async fn write_all(&mut self, buf: &[u8]) -> anyhow::Result<()> {
        let mut offset = 0;

        while offset < buf.len() {
            let n = self.stream.write(&buf[offset..]).await?;

            if n == 0 {
                return Err(anyhow::anyhow!("connection closed while writing"));
            }

            offset += n;
            self.written += n;
        }

        Ok(())
    }
}
