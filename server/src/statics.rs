//! File serving for the site root and the uploads tree.

use axum::{
    body::Body,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use log::error;
use std::path::{Path, PathBuf};
use tokio_util::io::ReaderStream;

/// A directory served over HTTP, minus any `hidden` sub-trees.
#[derive(Clone, Debug)]
pub struct StaticDir {
    root: PathBuf,
    hidden: Vec<PathBuf>,
}

impl StaticDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = root.canonicalize().unwrap_or(root);
        Self {
            root,
            hidden: Vec::new(),
        }
    }

    /// Never serve anything under `dir`.
    pub fn hide(mut self, dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        self.hidden
            .push(dir.canonicalize().unwrap_or_else(|_| dir.to_path_buf()));
        self
    }

    pub async fn serve(&self, url_path: &str) -> Response {
        let Some(path) = self.resolve(url_path).await else {
            return StatusCode::NOT_FOUND.into_response();
        };

        let file = match tokio::fs::File::open(&path).await {
            Ok(file) => file,
            Err(err) => {
                error!("Failed to open {}: {}", path.display(), err);
                return StatusCode::NOT_FOUND.into_response();
            }
        };

        let mime = mime_guess::from_path(&path).first_or_octet_stream();
        (
            [(header::CONTENT_TYPE, mime.as_ref().to_string())],
            Body::from_stream(ReaderStream::new(file)),
        )
            .into_response()
    }

    async fn resolve(&self, url_path: &str) -> Option<PathBuf> {
        let path_part = url_path.split('?').next().unwrap_or("");
        let trimmed = path_part.trim_start_matches('/');
        let decoded = urlencoding::decode(trimmed).ok()?.into_owned();

        // Dotfiles (.env, .git) are never served.
        if decoded.split(['/', '\\']).any(|segment| segment.starts_with('.') && segment != ".") {
            return None;
        }

        let joined = if decoded.is_empty() {
            self.root.clone()
        } else {
            self.root.join(decoded.as_str())
        };

        let mut canonical = tokio::fs::canonicalize(&joined).await.ok()?;
        if !canonical.starts_with(&self.root) {
            return None;
        }
        if self.hidden.iter().any(|dir| canonical.starts_with(dir)) {
            return None;
        }

        if tokio::fs::metadata(&canonical).await.ok()?.is_dir() {
            canonical = canonical.join("index.html");
        }
        tokio::fs::metadata(&canonical)
            .await
            .ok()
            .filter(|meta| meta.is_file())
            .map(|_| canonical)
    }
}
