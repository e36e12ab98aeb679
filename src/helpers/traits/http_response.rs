use http::{Method, StatusCode};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;

use crate::error::ServerError;
use crate::{dev_print, Options};

/// Response version tag stamped onto every start line.
pub const VERSION: &str = "HTTP/1.1";

/// What the dispatcher hands back: a status, a reason token, and a body.
///
/// The reason doubles as a machine-readable error tag (`file_not_found`,
/// `uri_is_empty`, ...), so it is part of the fixed vocabulary rather than
/// the canonical phrase for the status code.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: StatusCode,
    pub reason: &'static str,
    pub body: String,
}

impl Response {
    pub fn new(status: StatusCode, reason: &'static str) -> Response {
        Response {
            status,
            reason,
            body: String::new(),
        }
    }

    pub fn with_body(status: StatusCode, reason: &'static str, body: String) -> Response {
        Response {
            status,
            reason,
            body,
        }
    }

    /// Serializes the response into wire bytes.
    ///
    /// An empty body is replaced by the reason phrase before the length is
    /// computed, so no response ships without a body. For HEAD the body is
    /// suppressed on the wire while Content-Length still reports it.
    pub fn encode(&self, method: &Method) -> Vec<u8> {
        let body = match self.body.is_empty() {
            true => self.reason,
            false => self.body.as_str(),
        };

        let mut wire = String::new();
        wire.push_str(&format!(
            "{} {} {}\r\n",
            VERSION,
            self.status.as_u16(),
            self.reason
        ));
        wire.push_str("Content-Type: text/plain; charset=utf-8\r\n");
        wire.push_str("Content-Encoding: none\r\n");
        wire.push_str(&format!("Content-Length: {}\r\n", body.len()));
        wire.push_str("\r\n");
        if method != Method::HEAD {
            wire.push_str(body);
        }
        wire.into_bytes()
    }
}

/// Owns the connection for the response leg of the exchange.
pub struct Writer {
    pub stream: TcpStream,
    pub options: Options,
}

impl Writer {
    pub async fn respond(
        &mut self,
        response: &Response,
        method: &Method,
    ) -> Result<(), ServerError> {
        let bytes = response.encode(method);
        dev_print!("response: {:?}", String::from_utf8_lossy(&bytes));
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }
}
