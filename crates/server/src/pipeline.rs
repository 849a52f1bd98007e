use std::future::Future;

use bytes::Bytes;
use pfdns_context::{DnsRequestCtx, MiddlewareAction};
use pfdns_dns::{DnsFlags, DnsMessage, DnsMessageBuilder, DnsOpcode, DnsResponseCode};
use pfdns_resolver::ResolveError;

use crate::ServerState;

/// Run one request through the middleware chain and the resolver, then hand the answer to `send`.
///
/// Callbacks run after the answer was written. Silent middlewares produce no write and no callback.
pub(crate) async fn handle_request<G, L, F, Fut>(state: &ServerState<G, L>, ctx: &DnsRequestCtx<G, L>, send: F)
where
    G: Send + Sync + 'static,
    L: Send + Sync + 'static,
    F: FnOnce(Bytes) -> Fut,
    Fut: Future<Output = anyhow::Result<()>>,
{
    let client = ctx.client();

    let outcome = match pfdns_context::run_middlewares(state.middlewares.clone(), ctx).await {
        Ok(MiddlewareAction::Reply(resp)) => Ok(resp),
        Ok(MiddlewareAction::Silent) => {
            tracing::debug!(client = %client, "request dropped without answer");
            return;
        }
        Ok(MiddlewareAction::Next) => state.resolver.resolve(ctx).await,
        // a failing middleware must never let the query through to the resolver
        Err(e) => Err(ResolveError::Other(e)),
    };

    match outcome {
        Ok(resp) => {
            if let Err(e) = send(resp.clone()).await {
                tracing::warn!("Failed to write response to client {}: {}", client, e);
                report_error(state, ctx, ResolveError::Other(e)).await;
                return;
            }

            if let Some(cb) = &state.on_success {
                if let Err(e) = cb(ctx, &resp).await {
                    tracing::warn!("success callback failed: {}", e);
                }
            }
        }
        Err(e) => {
            if let Ok(message) = ctx.message() {
                let written = match error_response(message, e.response_code()) {
                    Ok(bytes) => send(bytes).await,
                    Err(err) => Err(err),
                };
                if let Err(err) = written {
                    tracing::warn!("Failed to write error response to client {}: {}", client, err);
                }
            }
            report_error(state, ctx, e).await;
        }
    }
}

async fn report_error<G, L>(state: &ServerState<G, L>, ctx: &DnsRequestCtx<G, L>, error: ResolveError) {
    match &state.on_error {
        Some(cb) => {
            if let Err(e) = cb(ctx, &error).await {
                tracing::warn!("error callback failed: {}", e);
            }
        }
        None => tracing::warn!(client = %ctx.client(), "request failed: {}", error),
    }
}

/// Build an error reply for `message` carrying `code`.
pub(crate) fn error_response(message: &DnsMessage, code: DnsResponseCode) -> anyhow::Result<Bytes> {
    let flags = DnsFlags::new(
        true,
        message.flags.opcode,
        false,
        false,
        message.flags.recursion_desired,
        true,
        false,
        message.flags.checking_disabled,
    );

    DnsMessageBuilder::new()
        .with_id(message.id)
        .with_flags(flags)
        .with_questions(if message.flags.opcode == DnsOpcode::Query {
            message.questions().to_vec()
        } else {
            vec![]
        })
        .with_response(code)
        .build()
        .encode()
}
