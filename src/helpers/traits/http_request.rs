use std::collections::HashMap;

use http::Method;

use crate::error::ServerError;
use crate::helpers::traits::bytes::RawRequest;

/// A decoded request, created once per connection.
///
/// Header keys keep the exact case the client sent, which `http::HeaderMap`
/// would fold away, so headers live in a plain map instead. The record is
/// not mutated after decoding; the dispatcher normalizes the target into a
/// local copy.
#[derive(Debug)]
pub struct Request {
    pub method: Method,
    pub uri: String,
    pub version: String,
    pub headers: HashMap<String, String>,
    pub body: String,
}

impl TryFrom<RawRequest> for Request {
    type Error = ServerError;

    fn try_from(raw: RawRequest) -> Result<Request, ServerError> {
        let mut fields = raw.request_line.split_whitespace();
        let (method, uri, version) = match (fields.next(), fields.next(), fields.next()) {
            (Some(method), Some(uri), Some(version)) => (method, uri, version),
            _ => return Err(ServerError::RequestLine(raw.request_line.clone())),
        };

        let method = method
            .parse::<Method>()
            .map_err(|_| ServerError::RequestLine(raw.request_line.clone()))?;

        // Each header line splits at the first ": ". No intermediate
        // encoding: a line without the separator aborts the request.
        let mut headers = HashMap::new();
        for line in &raw.header_lines {
            let (key, value) = line
                .split_once(": ")
                .ok_or_else(|| ServerError::Header(line.clone()))?;
            headers.insert(key.to_owned(), value.to_owned());
        }

        Ok(Request {
            method,
            uri: uri.to_owned(),
            version: version.to_owned(),
            headers,
            body: raw.body,
        })
    }
}
