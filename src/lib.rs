use std::env::current_dir;
use std::io;
use std::net::SocketAddr;
use std::path::PathBuf;

#[cfg(feature = "env")]
use std::str::FromStr;

pub mod error;
pub mod handler;
pub mod helpers;
pub mod store;

pub use error::ServerError;
pub use handler::HandleRequest;
pub use helpers::traits::bytes::{RawRequest, SplitRequest};
pub use helpers::traits::http_request::Request;
pub use helpers::traits::http_response::{Response, Writer};
pub use helpers::traits::http_stream::StreamHttp;
pub use store::{DiskStorage, FileStore, Storage, StoredFile};

pub mod external {
    pub use async_trait;
    #[cfg(feature = "env")]
    pub use dotenv;
    pub use http;
    pub use tokio;
}

#[macro_export]
macro_rules! dev_print {
    ($($rest:tt)*) => {
        if cfg!(feature = "debug") {
            println!($($rest)*)
        }
    };
}

use tokio::net::{TcpListener, TcpStream};

pub struct Server {
    pub listener: TcpListener,
    pub options: Options,
}

/// Connection handling knobs, shared by every accepted connection.
///
/// `root_path` doubles as the backing-storage root: every stored name
/// resolves to a file directly under it.
#[derive(Debug, Clone)]
pub struct Options {
    pub no_delay: bool,
    pub read_timeout_millis: u64,
    pub read_buffer_size: usize,
    pub root_path: PathBuf,
    pub current_client_addr: Option<SocketAddr>,
}

impl Options {
    pub fn new() -> Options {
        let mut _options = Options {
            no_delay: true,
            read_timeout_millis: 3000,
            read_buffer_size: 1024,
            root_path: current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            current_client_addr: None,
        };

        #[cfg(feature = "env")]
        {
            use std::env;
            if let Ok(data) = env::var("NO_DELAY") {
                // true, false
                if let Ok(data) = data.parse::<bool>() {
                    _options.no_delay = data;
                }
            }

            if let Ok(data) = env::var("READ_TIMEOUT_MILLIS") {
                if let Ok(data) = data.parse::<u64>() {
                    _options.read_timeout_millis = data;
                }
            }

            if let Ok(data) = env::var("READ_BUFFER_SIZE") {
                if let Ok(data) = data.parse::<usize>() {
                    _options.read_buffer_size = data;
                }
            }

            if let Ok(data) = env::var("ROOT_PATH") {
                if let Ok(data) = PathBuf::from_str(&data) {
                    _options.root_path = data;
                }
            }
        }

        _options
    }

    pub fn get_request_ip(&self) -> String {
        match &self.current_client_addr {
            Some(addr) => addr.ip().to_string(),
            None => "".into(),
        }
    }
}

impl Default for Options {
    fn default() -> Self {
        Options::new()
    }
}

impl Server {
    pub async fn new(address: &str) -> Result<Server, ServerError> {
        Self::with_options(address, Options::new()).await
    }

    pub async fn with_options(address: &str, options: Options) -> Result<Server, ServerError> {
        Ok(Server {
            listener: TcpListener::bind(address).await?,
            options,
        })
    }

    pub async fn accept(&mut self) -> Result<Accept, ServerError> {
        use std::time::Duration;

        let (stream, addr) = match self.listener.accept().await {
            Ok(data) => data,
            Err(e) => {
                if is_connection_error(&e) {
                    return Err(e.into());
                }
                dev_print!("Accept Error: {:?}", e);
                tokio::time::sleep(Duration::from_secs(1)).await;
                return Err(e.into());
            }
        };
        self.options.current_client_addr = Some(addr);
        Ok(Accept::new(stream, self.options.clone()))
    }
}

/// One accepted connection, ready to be parsed into a request.
pub struct Accept {
    pub tcp_stream: TcpStream,
    pub option: Options,
}

impl Accept {
    pub fn new(tcp_stream: TcpStream, option: Options) -> Self {
        Self { tcp_stream, option }
    }

    pub async fn parse_request(self) -> Result<(Request, Writer), ServerError> {
        self.tcp_stream.parse_request(&self.option).await
    }
}

fn is_connection_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::ConnectionRefused
            | io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ip_comes_from_the_accepted_peer() {
        let mut options = Options::new();
        options.current_client_addr = None;
        assert_eq!(options.get_request_ip(), "");

        options.current_client_addr = Some("127.0.0.1:9000".parse().unwrap());
        assert_eq!(options.get_request_ip(), "127.0.0.1");
    }
}
