use std::collections::HashMap;
use std::sync::Arc;

use crate::config::StaticFilesConfig;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::routing::{Handler, HandlerError, StaticFiles, is_valid_path};

/// Routing table keyed by the first path segment of the request target.
#[derive(Clone, Default)]
pub struct Router {
    routes: HashMap<String, Arc<dyn Handler>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Router with the static file handler mounted per `cfg`.
    pub fn from_config(cfg: &StaticFilesConfig) -> Self {
        let mut router = Self::new();
        router.mount(
            cfg.mount.clone(),
            StaticFiles::new(cfg.mount.clone(), cfg.root.clone()),
        );
        router
    }

    /// Registers `handler` for targets whose first segment is `key`.
    /// A later mount under the same key replaces the earlier one.
    pub fn mount(&mut self, key: impl Into<String>, handler: impl Handler + 'static) {
        self.routes.insert(key.into(), Arc::new(handler));
    }

    pub fn route(mut self, key: impl Into<String>, handler: impl Handler + 'static) -> Self {
        self.mount(key, handler);
        self
    }

    /// Produces the response for a complete request. Never fails: invalid
    /// targets, unknown routes and handler errors all map to responses.
    pub fn respond(&self, request: &Request) -> Response {
        if !is_valid_path(&request.path) {
            tracing::warn!(path = %request.path, "Rejecting invalid request target");
            return Response::bad_request();
        }

        let key = request.route_key();
        let Some(handler) = self.routes.get(key) else {
            tracing::debug!(path = %request.path, "No route");
            return Response::not_found();
        };

        match handler.handle(request) {
            Ok(response) => response,
            Err(HandlerError::NotFound(what)) => {
                tracing::debug!(route = key, what = %what, "Handler found nothing");
                Response::not_found()
            }
            Err(e) => {
                tracing::error!(route = key, error = %e, method = ?request.method, path = %request.path, "Handler failed");
                Response::internal_error()
            }
        }
    }
}
