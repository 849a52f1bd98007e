use std::{net::SocketAddr, sync::Arc, time::Duration};

use async_trait::async_trait;
use bytes::Bytes;
use once_cell::sync::OnceCell;
use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use pfdns_dns::DnsMessage;
use tokio::time::Instant;

/// The type of DNS request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestType {
    /// UDP
    UDP,
    /// TCP
    TCP,
}

impl RequestType {
    /// Largest reply the transport carries when the client did not advertise a size with EDNS.
    pub fn default_max_reply_size(self) -> usize {
        match self {
            RequestType::UDP => 512,
            RequestType::TCP => u16::MAX as usize,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DnsRequestCtx<G, L> {
    request_type: RequestType,
    client: SocketAddr,
    raw: Bytes,
    message: OnceCell<DnsMessage>,
    budget: RequestBudget,
    global: Arc<G>,
    local: Arc<RwLock<L>>,
}

impl<G, L> DnsRequestCtx<G, L> {
    pub fn new(
        deadline: Duration,
        request_type: RequestType,
        client: SocketAddr,
        raw: Bytes,
        global: Arc<G>,
        local: L,
    ) -> Self {
        Self {
            budget: RequestBudget::new(deadline),
            request_type,
            client,
            raw,
            message: OnceCell::new(),
            global,
            local: Arc::new(RwLock::new(local)),
        }
    }

    /// The deadline for the request.
    pub fn deadline(&self) -> Instant {
        self.budget.at()
    }

    // Remaining time budget for the request.
    pub fn remaining(&self) -> Option<Duration> {
        self.budget.remaining()
    }

    pub fn budget(&self) -> &RequestBudget {
        &self.budget
    }

    /// Request Type
    pub fn request_type(&self) -> RequestType {
        self.request_type
    }

    /// Address of the client that sent the request.
    pub fn client(&self) -> SocketAddr {
        self.client
    }

    /// Lazily decode and return the DNS message.
    pub fn message(&self) -> anyhow::Result<&DnsMessage> {
        self.message.get_or_try_init(|| DnsMessage::decode(&self.raw))
    }

    /// Raw request bytes
    pub fn raw(&self) -> Bytes {
        self.raw.clone()
    }

    /// Global context
    pub fn global(&self) -> &G {
        &self.global
    }

    /// Local context
    pub fn local(&self) -> RwLockReadGuard<'_, L> {
        self.local.read()
    }

    /// Mutable local context
    pub fn local_mut(&self) -> RwLockWriteGuard<'_, L> {
        self.local.write()
    }
}

/// What a middleware decided to do with a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MiddlewareAction {
    /// Hand the query to the next middleware, and finally the resolver.
    Next,
    /// Answer with these bytes.
    Reply(Bytes),
    /// Drop the query without answering or forwarding it.
    Silent,
}

#[async_trait]
pub trait DnsMiddleware<G, L>: Send + Sync {
    async fn on_query(&self, ctx: &DnsRequestCtx<G, L>) -> anyhow::Result<MiddlewareAction>;
}

/// Run the chain in order, stopping at the first middleware that does not return [`MiddlewareAction::Next`].
pub async fn run_middlewares<G, L>(
    mws: Arc<Vec<Arc<dyn DnsMiddleware<G, L>>>>,
    ctx: &DnsRequestCtx<G, L>,
) -> anyhow::Result<MiddlewareAction> {
    for m in mws.iter() {
        match m.on_query(ctx).await? {
            MiddlewareAction::Next => continue,
            action => return Ok(action),
        }
    }
    Ok(MiddlewareAction::Next)
}

/// A budget for processing a DNS request, based on a deadline.
#[derive(Debug, Clone)]
pub struct RequestBudget {
    deadline: Instant,
}

impl RequestBudget {
    pub fn new(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
        }
    }

    pub fn at(&self) -> Instant {
        self.deadline
    }

    pub fn remaining(&self) -> Option<Duration> {
        let now = Instant::now();
        (now < self.deadline).then_some(self.deadline - now)
    }

    pub fn cap(&self, per_step: Duration) -> Instant {
        let rem = self.remaining().unwrap_or_default();
        Instant::now() + rem.min(per_step)
    }
}
