use std::io;

use async_trait::async_trait;
use http::StatusCode;

use crate::helpers::traits::http_request::Request;
use crate::helpers::traits::http_response::Response;
use crate::store::FileStore;

#[async_trait]
pub trait HandleRequest {
    async fn handle(&self, store: &FileStore) -> Response;
}

#[async_trait]
impl HandleRequest for Request {
    /// Routes a decoded request against the store.
    ///
    /// Target validation runs first, before any store lookup: one leading
    /// `/` is stripped, an empty target and any remaining separator are
    /// both rejected with 406 (the namespace is flat).
    async fn handle(&self, store: &FileStore) -> Response {
        let target = self.uri.strip_prefix('/').unwrap_or(&self.uri);
        if target.is_empty() {
            return Response::new(StatusCode::NOT_ACCEPTABLE, "uri_is_empty");
        }
        if target.contains('/') {
            return Response::new(StatusCode::NOT_ACCEPTABLE, "subdirectories_not_allowed");
        }

        match self.method.as_str() {
            "GET" | "HEAD" => get(store, target).await,
            "POST" => post(store, target, &self.body).await,
            "PUT" => put(store, target, &self.body).await,
            "DELETE" => delete(store, target).await,
            _ => Response::new(StatusCode::METHOD_NOT_ALLOWED, "unsupported_method"),
        }
    }
}

// HEAD shares this path; its body is dropped by the encoder, not here.
async fn get(store: &FileStore, target: &str) -> Response {
    match store.find(target).await {
        Some(entry) => {
            let content = entry.content().await;
            Response::with_body(
                StatusCode::OK,
                "OK",
                String::from_utf8_lossy(&content).into_owned(),
            )
        }
        None => Response::new(StatusCode::NOT_FOUND, "file_not_found"),
    }
}

async fn post(store: &FileStore, target: &str, body: &str) -> Response {
    match store.create(target, body.as_bytes()).await {
        Ok(()) => Response::new(StatusCode::CREATED, "Created"),
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            Response::new(StatusCode::BAD_REQUEST, "file_exists")
        }
        Err(e) => Response::with_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_server_error",
            format!("Unable to create new file: {e}"),
        ),
    }
}

async fn put(store: &FileStore, target: &str, body: &str) -> Response {
    let Some(entry) = store.find(target).await else {
        return Response::new(StatusCode::NOT_FOUND, "file_not_found");
    };
    match store.replace(&entry, body.as_bytes()).await {
        Ok(()) => Response::new(StatusCode::OK, "OK"),
        Err(e) => Response::with_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_server_error",
            format!("Error while modifying file: {e}"),
        ),
    }
}

async fn delete(store: &FileStore, target: &str) -> Response {
    if store.find(target).await.is_none() {
        return Response::new(StatusCode::NOT_FOUND, "file_not_found");
    }
    match store.remove(target).await {
        Ok(()) => Response::new(StatusCode::OK, "OK"),
        Err(e) => Response::with_body(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_server_error",
            format!("Error while deleting file: {e}"),
        ),
    }
}
