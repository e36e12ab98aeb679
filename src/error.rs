use thiserror::Error;

/// Failures raised between the socket and the dispatcher.
///
/// The decode variants (`EmptyRequest`, `RequestLine`, `Header`) are fatal
/// to the request: the connection is closed without sending a response,
/// since a stream we could not parse gives us no safe way to frame one.
/// `Io` covers transport failures on either leg of the exchange.
#[derive(Debug, Error)]
pub enum ServerError {
    #[error("connection closed before any request data arrived")]
    EmptyRequest,

    #[error("malformed request line: {0:?}")]
    RequestLine(String),

    #[error("malformed header line: {0:?}")]
    Header(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
