use std::{net::SocketAddr, sync::Arc};

use async_trait::async_trait;
use bytes::{Bytes, BytesMut};
use pfdns_context::DnsRequestCtx;
use pfdns_dns::DnsMessage;
use rand::Rng;

use crate::{DnsResolver, ResolveError};

use super::{
    request::UpstreamResolveRequest,
    upstream::{Limits, Upstreams},
};

/// Resolver that forwards the incoming request to a defined upstream server.
pub struct ForwardResolver {
    upstreams: Arc<Upstreams>,
}

impl ForwardResolver {
    pub async fn new(upstreams: &[SocketAddr], limits: Limits) -> anyhow::Result<Self> {
        if upstreams.is_empty() {
            tracing::warn!(
                "No upstreams configured for forward resolver, it will not be able to resolve any queries!"
            );
        }
        Ok(Self {
            upstreams: Arc::new(Upstreams::new(upstreams, limits).await?),
        })
    }
}

#[async_trait]
impl<G, L> DnsResolver<G, L> for ForwardResolver
where
    G: Send + Sync + 'static,
    L: Send + Sync,
{
    async fn resolve(&self, ctx: &DnsRequestCtx<G, L>) -> Result<Bytes, ResolveError> {
        let query_message = ctx
            .message()
            .map_err(|e| ResolveError::InvalidRequest(e.to_string()))?;

        if query_message.questions().len() != 1 {
            return Err(ResolveError::InvalidRequest(format!(
                "request contains {} questions, expected 1",
                query_message.questions().len(),
            )));
        }

        let (randomized_query, _) = generate_tid(&ctx.raw());
        let request = UpstreamResolveRequest::new(
            ctx.request_type(),
            randomized_query,
            ctx.budget().clone(),
            self.upstreams.clone(),
        );
        let upstream_response = request.resolve().await?;

        let response = restore_tid(&upstream_response, query_message.id);

        let response_message =
            DnsMessage::decode(&response).map_err(|e| ResolveError::InvalidResponse(e.to_string()))?;

        // ensure that the response has exactly one question
        if response_message.questions().len() != 1 {
            return Err(ResolveError::InvalidResponse(format!(
                "upstream response contains {} questions, expected 1",
                response_message.questions().len(),
            )));
        }

        let req_q = query_message.questions().first();
        let resp_q = response_message.questions().first();

        // ensure that the response question matches the request question
        if req_q != resp_q {
            return Err(ResolveError::InvalidResponse(
                "upstream response question does not match request question".to_string(),
            ));
        }
        Ok(response)
    }
}

/// Put the client's transaction id back on an upstream response.
fn restore_tid(response: &[u8], transaction_id: u16) -> Bytes {
    let mut bytes = BytesMut::from(response);
    bytes[0..2].copy_from_slice(&transaction_id.to_be_bytes());
    bytes.freeze()
}

/// Modify the transaction ID of the given query to a random value to prevent poisoning attacks.
fn generate_tid(query: &[u8]) -> (Bytes, u16) {
    let mut rng = rand::rng();

    let randomized_id = rng.random::<u16>();

    let mut bytes = BytesMut::from(query);
    // overwrite the transaction id.
    bytes[0] = (randomized_id >> 8) as u8;
    bytes[1] = (randomized_id & 0xFF) as u8;

    (bytes.freeze(), randomized_id)
}

#[cfg(test)]
#[path = "resolver_tests.rs"]
mod resolver_tests;
