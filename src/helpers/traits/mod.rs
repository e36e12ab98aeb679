pub mod bytes;
pub mod http_request;
pub mod http_response;
pub mod http_stream;
