use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::timeout;

use crate::error::ServerError;
use crate::helpers::traits::bytes::SplitRequest;
use crate::helpers::traits::http_request::Request;
use crate::helpers::traits::http_response::Writer;
use crate::{dev_print, Options};

#[async_trait]
pub trait StreamHttp {
    async fn parse_request(self, options: &Options) -> Result<(Request, Writer), ServerError>;
}

#[async_trait]
impl StreamHttp for TcpStream {
    async fn parse_request(
        mut self,
        options: &Options,
    ) -> Result<(Request, Writer), ServerError> {
        self.set_nodelay(options.no_delay)?;

        let bytes = read_request_bytes(&mut self, options).await?;
        dev_print!("request: {:?}", String::from_utf8_lossy(&bytes));

        let raw = bytes
            .as_slice()
            .tokenize()
            .ok_or(ServerError::EmptyRequest)?;
        let request = Request::try_from(raw)?;

        Ok((
            request,
            Writer {
                stream: self,
                options: options.clone(),
            },
        ))
    }
}

/// Accumulates one request's bytes from the connection.
///
/// Framing honors Content-Length: once the blank-line boundary shows up the
/// header block is scanned for a length, and reading continues until that
/// many body bytes have arrived. Without a Content-Length the request ends
/// at the boundary. A peer that never sends a boundary is bounded by the
/// read timeout, and whatever accumulated by then goes to the tokenizer,
/// which treats a boundary-less block as headers-only.
async fn read_request_bytes(
    stream: &mut TcpStream,
    options: &Options,
) -> Result<Vec<u8>, ServerError> {
    let mut bytes: Vec<u8> = vec![];
    let mut buf = vec![0; options.read_buffer_size];
    let read_timeout = Duration::from_millis(options.read_timeout_millis);

    let mut header_end = None;
    let mut content_length = None;
    loop {
        let n = match timeout(read_timeout, stream.read(&mut buf)).await {
            Ok(read_result) => read_result?,
            Err(_elapsed) => break,
        };
        if n == 0 {
            break;
        }
        bytes.extend_from_slice(&buf[..n]);

        if header_end.is_none() {
            if let Some(end) = find_header_end(&bytes) {
                header_end = Some(end);
                content_length = parse_content_length(&bytes[..end]);
            }
        }
        if let Some(end) = header_end {
            match content_length {
                Some(length) if bytes.len() < end + length => {}
                _ => break,
            }
        }
    }

    if bytes.is_empty() {
        return Err(ServerError::EmptyRequest);
    }
    Ok(bytes)
}

/// Index one past the header/body boundary. The subset allows headers to end
/// in bare `\n`, so both `\n\r\n` and `\n\n` count.
fn find_header_end(data: &[u8]) -> Option<usize> {
    data.windows(3)
        .position(|window| window == b"\n\r\n")
        .map(|pos| pos + 3)
        .or_else(|| {
            data.windows(2)
                .position(|window| window == b"\n\n")
                .map(|pos| pos + 2)
        })
}

fn parse_content_length(headers: &[u8]) -> Option<usize> {
    let headers_str = String::from_utf8_lossy(headers);
    headers_str
        .lines()
        .find(|line| line.to_lowercase().starts_with("content-length:"))
        .and_then(|line| {
            line.split(':')
                .nth(1)
                .and_then(|len| len.trim().parse().ok())
        })
}
