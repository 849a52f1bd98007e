use async_trait::async_trait;
use pfdns_context::{DnsMiddleware, DnsRequestCtx, MiddlewareAction};

use crate::{evaluator::Outcome, global::Global, local::Local, query::Query, records};

/// Answers queries from devices that are not allowed through, and lets the others continue down the chain.
pub struct EnforcementMiddleware;

#[async_trait]
impl DnsMiddleware<Global, Local> for EnforcementMiddleware {
    async fn on_query(&self, ctx: &DnsRequestCtx<Global, Local>) -> anyhow::Result<MiddlewareAction> {
        let message = ctx.message()?;

        let Some(query) = Query::new(message, ctx.client().ip(), ctx.request_type()) else {
            return Ok(MiddlewareAction::Next);
        };

        let outcome = ctx.global().evaluator.evaluate(&query, ctx.budget()).await;

        let action = match &outcome {
            Outcome::PassThrough => MiddlewareAction::Next,
            Outcome::Redirect(address) => {
                MiddlewareAction::Reply(records::build_address_answer(&query, *address).encode()?)
            }
            Outcome::Blackhole { target, address } => {
                MiddlewareAction::Reply(records::build_cname_answer(&query, target, *address).encode()?)
            }
            Outcome::NoAnswer => MiddlewareAction::Silent,
        };

        let mut local = ctx.local_mut();
        local.synthesized = matches!(action, MiddlewareAction::Reply(_));
        local.outcome = Some(outcome);

        Ok(action)
    }
}

#[cfg(test)]
#[path = "enforcement_tests.rs"]
mod enforcement_tests;
