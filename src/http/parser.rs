use bytes::Bytes;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::http::request::{HeaderField, Request, tokenize};

const CONTENT_LENGTH: &str = "Content-Length";

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("connection closed before a request line arrived")]
    ConnectionClosed,
    #[error("connection closed in the middle of a request")]
    Truncated,
    #[error("malformed request line {0:?}")]
    InvalidRequestLine(String),
    #[error("malformed header line {0:?}")]
    InvalidHeader(String),
    #[error("invalid content length {0:?}")]
    InvalidContentLength(String),
    #[error("request head is not valid UTF-8")]
    InvalidEncoding,
    #[error("read failed: {0}")]
    Io(#[from] std::io::Error),
}

impl ParseError {
    /// Whether the peer sent bytes that do not form a request, as opposed to
    /// hanging up or the socket failing.
    pub fn is_malformed(&self) -> bool {
        !matches!(self, ParseError::ConnectionClosed | ParseError::Io(_))
    }
}

/// Reads one request from `reader`.
///
/// Consumes the request line, the header block up to and including its empty
/// line, and exactly `Content-Length` body bytes when that header is present.
/// Nothing past the body is consumed.
pub async fn parse_request<R>(reader: &mut R) -> Result<Request, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let request_line = read_line(reader)
        .await?
        .ok_or(ParseError::ConnectionClosed)?;
    let (method, target, version) = split_request_line(&request_line)?;

    let mut headers = Vec::new();
    loop {
        let line = read_line(reader).await?.ok_or(ParseError::Truncated)?;
        if line.is_empty() {
            break;
        }

        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ParseError::InvalidHeader(line.clone()))?;
        headers.push((name.to_string(), tokenize(value)));
    }

    let body = match content_length(&headers)? {
        Some(len) => Some(read_body(reader, len).await?),
        None => None,
    };

    Ok(Request {
        method: method.to_string(),
        target: target.to_string(),
        version: version.to_string(),
        headers,
        body,
    })
}

/// Reads up to the next CRLF and returns the line without it.
///
/// A bare LF does not end a line. Returns `None` on a clean end of stream.
async fn read_line<R>(reader: &mut R) -> Result<Option<String>, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    let mut buf = Vec::new();

    while !buf.ends_with(b"\r\n") {
        if reader.read_until(b'\n', &mut buf).await? == 0 {
            return if buf.is_empty() {
                Ok(None)
            } else {
                Err(ParseError::Truncated)
            };
        }
    }

    buf.truncate(buf.len() - 2);
    String::from_utf8(buf)
        .map(Some)
        .map_err(|_| ParseError::InvalidEncoding)
}

fn split_request_line(line: &str) -> Result<(&str, &str, &str), ParseError> {
    let mut parts = line.splitn(3, ' ');
    let invalid = || ParseError::InvalidRequestLine(line.to_string());

    let method = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let target = parts.next().filter(|s| !s.is_empty()).ok_or_else(invalid)?;
    let version = parts
        .next()
        .filter(|s| !s.is_empty() && !s.contains(' '))
        .ok_or_else(invalid)?;

    Ok((method, target, version))
}

// Last declaration wins, as it does in the environment.
fn content_length(headers: &[HeaderField]) -> Result<Option<u64>, ParseError> {
    let Some((_, tokens)) = headers
        .iter()
        .rev()
        .find(|(name, _)| name.eq_ignore_ascii_case(CONTENT_LENGTH))
    else {
        return Ok(None);
    };

    match tokens.as_slice() {
        [len] => len
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ParseError::InvalidContentLength(len.clone())),
        _ => Err(ParseError::InvalidContentLength(tokens.join(" "))),
    }
}

async fn read_body<R>(reader: &mut R, len: u64) -> Result<Bytes, ParseError>
where
    R: AsyncBufRead + Unpin,
{
    // Grows with the bytes that actually arrive instead of trusting the header.
    let mut body = Vec::new();
    (&mut *reader).take(len).read_to_end(&mut body).await?;

    if (body.len() as u64) < len {
        return Err(ParseError::Truncated);
    }

    Ok(Bytes::from(body))
}
