use async_trait::async_trait;
use pfdns_context::{DnsMiddleware, DnsRequestCtx, MiddlewareAction};

use crate::{global::Global, local::Local, policy::BlackholeTarget, query::Query, records};

/// Answers every query with a CNAME to a fixed host.
pub struct BlackholeMiddleware {
    target: BlackholeTarget,
}

impl BlackholeMiddleware {
    pub fn new(target: BlackholeTarget) -> Self {
        Self { target }
    }
}

#[async_trait]
impl DnsMiddleware<Global, Local> for BlackholeMiddleware {
    async fn on_query(&self, ctx: &DnsRequestCtx<Global, Local>) -> anyhow::Result<MiddlewareAction> {
        let message = ctx.message()?;

        let Some(query) = Query::new(message, ctx.client().ip(), ctx.request_type()) else {
            return Ok(MiddlewareAction::Next);
        };

        let reply = records::build_cname_answer(&query, &self.target.name, self.target.address).encode()?;
        ctx.local_mut().synthesized = true;

        Ok(MiddlewareAction::Reply(reply))
    }
}
