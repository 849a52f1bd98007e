use std::{net::SocketAddr, sync::Arc};

use bytes::BytesMut;
use pfdns_context::{DnsRequestCtx, RequestType};
use tokio::net::UdpSocket;

use crate::{ServerState, pipeline::handle_request};

/// Largest datagram accepted from clients.
const RECV_SIZE: usize = 4096;

/// Run the DNS server over UDP.
pub async fn run_udp<L, G>(bind_addr: SocketAddr, state: &Arc<ServerState<G, L>>) -> anyhow::Result<()>
where
    L: Default + Send + Sync + 'static,
    G: Send + Sync + 'static,
{
    let socket = Arc::new(UdpSocket::bind(bind_addr).await?);
    let mut buffer = BytesMut::with_capacity(RECV_SIZE);

    tracing::info!("UDP listening on {}", bind_addr);

    loop {
        buffer.resize(RECV_SIZE, 0);
        let (len, client) = match socket.recv_from(&mut buffer[..]).await {
            Ok(r) => r,
            Err(e) => {
                // ICMP errors from earlier sends surface here, the socket itself is still usable.
                tracing::warn!("UDP receive failed: {}", e);
                continue;
            }
        };
        let raw = buffer.split_to(len).freeze();

        let sock = socket.clone();
        let state = state.clone();

        tokio::spawn(async move {
            let ctx = DnsRequestCtx::new(
                state.timeout,
                RequestType::UDP,
                client,
                raw,
                state.global.clone(),
                L::default(),
            );

            handle_request(&state, &ctx, |resp| async move {
                sock.send_to(&resp, client).await?;
                Ok(())
            })
            .await;
        });
    }
}
