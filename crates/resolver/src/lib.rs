use bytes::Bytes;

use async_trait::async_trait;
use pfdns_context::DnsRequestCtx;
use pfdns_dns::DnsResponseCode;

pub mod forwarder;

/// Final handler of the request pipeline, consulted when no middleware answered.
#[async_trait]
pub trait DnsResolver<G: Send + Sync, L> {
    async fn resolve(&self, ctx: &DnsRequestCtx<G, L>) -> Result<Bytes, ResolveError>;
}

/// Errors a resolver can run into.
#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("request deadline exceeded")]
    Timeout,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("invalid upstream response: {0}")]
    InvalidResponse(String),
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ResolveError {
    /// The response code sent back to the client for this error.
    pub fn response_code(&self) -> DnsResponseCode {
        match self {
            ResolveError::InvalidRequest(_) => DnsResponseCode::FormatError,
            ResolveError::Timeout | ResolveError::InvalidResponse(_) | ResolveError::Other(_) => {
                DnsResponseCode::ServerFailure
            }
        }
    }
}
