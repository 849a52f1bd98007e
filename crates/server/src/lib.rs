use std::{net::SocketAddr, sync::Arc, time::Duration};

use futures::{FutureExt, future::BoxFuture};
use pfdns_context::{DnsMiddleware, DnsRequestCtx};
use pfdns_resolver::{DnsResolver, ResolveError};
use tcp::run_tcp;
use udp::run_udp;

mod pipeline;
mod tcp;
mod udp;

pub type SuccessCallback<G, L> =
    Arc<dyn for<'a> Fn(&'a DnsRequestCtx<G, L>, &'a bytes::Bytes) -> BoxFuture<'a, anyhow::Result<()>> + Send + Sync>;

pub type ErrorCallback<G, L> = Arc<
    dyn for<'a> Fn(&'a DnsRequestCtx<G, L>, &'a ResolveError) -> BoxFuture<'a, Result<(), ResolveError>> + Send + Sync,
>;

pub type ServerMiddlewares<G, L> = Arc<Vec<Arc<dyn DnsMiddleware<G, L> + 'static>>>;

pub type DynResolver<G, L> = dyn DnsResolver<G, L> + Send + Sync;

/// Everything a request task needs, shared by all of them.
pub struct ServerState<G, L> {
    pub resolver: Arc<DynResolver<G, L>>,
    pub middlewares: ServerMiddlewares<G, L>,
    pub on_success: Option<SuccessCallback<G, L>>,
    pub on_error: Option<ErrorCallback<G, L>>,
    pub global: Arc<G>,
    pub timeout: Duration,
}

impl<G, L> ServerState<G, L> {
    pub fn new(resolver: Arc<DynResolver<G, L>>, global: Arc<G>, timeout: Duration) -> Self {
        Self {
            resolver,
            middlewares: Arc::new(Vec::new()),
            on_success: None,
            on_error: None,
            global,
            timeout,
        }
    }

    /// Append a middleware to the end of the chain.
    pub fn add_middleware(&mut self, middleware: Arc<dyn DnsMiddleware<G, L> + 'static>) {
        let mut chain = self.middlewares.as_ref().clone();
        chain.push(middleware);
        self.middlewares = Arc::new(chain);
    }

    pub fn set_success_handler<F>(&mut self, f: F)
    where
        F: for<'a> Fn(&'a DnsRequestCtx<G, L>, &'a bytes::Bytes) -> BoxFuture<'a, anyhow::Result<()>>
            + Send
            + Sync
            + 'static,
    {
        self.on_success = Some(Arc::new(f));
    }

    pub fn set_error_handler<F>(&mut self, f: F)
    where
        F: for<'a> Fn(&'a DnsRequestCtx<G, L>, &'a ResolveError) -> BoxFuture<'a, Result<(), ResolveError>>
            + Send
            + Sync
            + 'static,
    {
        self.on_error = Some(Arc::new(f));
    }
}

/// DNS Server
pub struct DnsServer<G, L> {
    bind_addr: SocketAddr,
    state: Arc<ServerState<G, L>>,
}

impl<L: Default + Send + Sync + 'static, G: Send + Sync + 'static> DnsServer<G, L> {
    pub fn new(bind_addr: SocketAddr, state: ServerState<G, L>) -> Self {
        Self {
            bind_addr,
            state: Arc::new(state),
        }
    }

    /// Run the DNS server, listening for incoming requests.
    pub async fn run(self) -> anyhow::Result<()> {
        let state = &self.state;

        let udp_future = run_udp(self.bind_addr, state).boxed();

        let tcp_future = run_tcp(self.bind_addr, state).boxed();

        futures::future::try_join_all(vec![udp_future, tcp_future]).await?;

        Ok(())
    }
}
