//! Request routing.
//!
//! The server hands every complete request to a [`Router`], which picks a
//! [`Handler`] by the first segment of the request target. Handlers only see
//! parsed requests and only return response values; they never touch a
//! socket.

pub mod path;
pub mod router;
pub mod static_files;

use crate::http::request::Request;
use crate::http::response::Response;

pub use path::is_valid_path;
pub use router::Router;
pub use static_files::StaticFiles;

/// Failure signalled by a handler. The router turns it into a response.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("{0}")]
    Failed(String),
}

/// Something that answers requests under one route key.
pub trait Handler: Send + Sync {
    fn handle(&self, request: &Request) -> Result<Response, HandlerError>;
}

impl<F> Handler for F
where
    F: Fn(&Request) -> Result<Response, HandlerError> + Send + Sync,
{
    fn handle(&self, request: &Request) -> Result<Response, HandlerError> {
        self(request)
    }
}
