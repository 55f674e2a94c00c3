//! Session-level error taxonomy.

use thiserror::Error;

use crate::cache::store::CacheError;
use crate::http::request::RequestError;
use crate::http::response::{canned, Status};
use crate::origin::OriginError;

/// Anything that stops a session from producing a normal response.
#[derive(Debug, Error)]
pub enum ProxyError {
    #[error(transparent)]
    Request(#[from] RequestError),

    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Origin(#[from] OriginError),
}

impl ProxyError {
    /// Status sent to the client for this error.
    pub fn status(&self) -> Status {
        match self {
            ProxyError::Request(_) => Status::BAD_REQUEST,
            ProxyError::Cache(_) => Status::INTERNAL_SERVER_ERROR,
            ProxyError::Origin(e) if e.is_timeout() => Status::GATEWAY_TIMEOUT,
            ProxyError::Origin(_) => Status::BAD_GATEWAY,
        }
    }

    pub fn to_response(&self) -> Vec<u8> {
        canned(self.status(), &format!("{}\n", self))
    }
}
