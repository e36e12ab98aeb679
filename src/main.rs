use std::sync::Arc;

use flathttp::{DiskStorage, FileStore, HandleRequest, Server, ServerError};

#[tokio::main]
async fn main() -> Result<(), ServerError> {
    #[cfg(feature = "env")]
    flathttp::external::dotenv::dotenv().ok();

    let address = format!("127.0.0.1:{}", 8080);
    let mut server = Server::new(&address).await?;

    let store = Arc::new(FileStore::new(Box::new(DiskStorage::new(
        server.options.root_path.clone(),
    ))));

    println!("server listening on {}", address);
    loop {
        let accept = match server.accept().await {
            Ok(accept) => accept,
            Err(e) => {
                eprintln!("failed to accept connection: {e:?}");
                continue;
            }
        };
        let store = Arc::clone(&store);
        let peer = accept.option.get_request_ip();
        tokio::spawn(async move {
            // Decode failures close the connection without a response.
            let (request, mut writer) = match accept.parse_request().await {
                Ok(data) => data,
                Err(e) => {
                    eprintln!("failed to parse request from {peer}: {e:?}");
                    return;
                }
            };
            let response = request.handle(&store).await;
            if let Err(e) = writer.respond(&response, &request.method).await {
                eprintln!("failed to write response to {peer}: {e:?}");
            }
        });
    }
}
