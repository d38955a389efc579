//! Static asset serving for file and folder routes.
//!
//! # Responsibilities
//! - Resolve the file behind a file route, or the wildcard remainder of a
//!   folder route beneath its directory
//! - Stream the file with a content type guessed from its extension
//!
//! # Design Decisions
//! - A missing file is a per-request `NotFound`, never a process error
//! - Remainders with `.`/`..` segments resolve to `NotFound`
//! - Files are streamed, not buffered

use std::path::{Component, Path, PathBuf};

use axum::body::Body;
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::Response;
use thiserror::Error;
use tokio::fs::File;
use tokio_util::io::ReaderStream;

use crate::config::RouteConfig;

#[derive(Debug, Error)]
pub enum AssetError {
    #[error("asset not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read asset {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Local file answering a request on a static route.
pub fn resolve(route: &RouteConfig, remainder: Option<&str>) -> Result<PathBuf, AssetError> {
    match route {
        RouteConfig::File(f) => Ok(f.file.clone()),
        RouteConfig::Folder(f) => {
            let remainder = remainder.unwrap_or_default();
            let relative = Path::new(remainder);
            let escapes = relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));
            if remainder.is_empty() || escapes {
                return Err(AssetError::NotFound(f.folder.join(remainder)));
            }
            Ok(f.folder.join(relative))
        }
        RouteConfig::Function(f) => Err(AssetError::NotFound(f.handler.clone())),
    }
}

/// Stream the file at `path`.
pub async fn serve_file(path: &Path) -> Result<Response, AssetError> {
    let io_err = |source: std::io::Error| {
        if source.kind() == std::io::ErrorKind::NotFound {
            AssetError::NotFound(path.to_path_buf())
        } else {
            AssetError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    };

    let file = File::open(path).await.map_err(io_err)?;
    let metadata = file.metadata().await.map_err(io_err)?;
    if !metadata.is_file() {
        return Err(AssetError::NotFound(path.to_path_buf()));
    }

    let mime = mime_guess::from_path(path).first_or_octet_stream();
    let mut response = Response::new(Body::from_stream(ReaderStream::new(file)));
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_str(mime.as_ref())
            .unwrap_or(HeaderValue::from_static("application/octet-stream")),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(metadata.len()));

    Ok(response)
}
