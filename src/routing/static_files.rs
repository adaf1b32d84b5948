use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::http::request::Request;
use crate::http::response::{Response, ResponseBuilder, StatusCode};
use crate::routing::{Handler, HandlerError};

/// Serves files from `root` for targets under `/<mount>/`.
///
/// A directory is answered with its `index.html`. Targets containing a `..`
/// segment are treated as missing.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    mount: String,
    root: PathBuf,
}

impl StaticFiles {
    pub fn new(mount: impl Into<String>, root: impl Into<PathBuf>) -> Self {
        Self {
            mount: mount.into(),
            root: root.into(),
        }
    }

    fn resolve(&self, target: &str) -> Option<PathBuf> {
        let rest = target
            .strip_prefix('/')
            .and_then(|t| t.strip_prefix(self.mount.as_str()))
            .filter(|rest| rest.is_empty() || rest.starts_with('/'))?;

        let mut path = self.root.clone();
        for segment in rest.split('/').filter(|s| !s.is_empty()) {
            if segment == ".." {
                return None;
            }
            path.push(segment);
        }

        if path.is_dir() {
            path.push("index.html");
        }
        Some(path)
    }
}

impl Handler for StaticFiles {
    fn handle(&self, request: &Request) -> Result<Response, HandlerError> {
        let path = self
            .resolve(&request.path)
            .ok_or_else(|| HandlerError::NotFound(request.path.clone()))?;

        let body = fs::read(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => HandlerError::NotFound(path.display().to_string()),
            _ => HandlerError::Io(e),
        })?;

        tracing::debug!(file = %path.display(), bytes = body.len(), "Serving static file");

        Ok(ResponseBuilder::new(StatusCode::Ok).body(body).build())
    }
}
