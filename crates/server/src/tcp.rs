use std::{net::SocketAddr, sync::Arc};

use bytes::Bytes;
use pfdns_context::{DnsRequestCtx, RequestType};
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    time::timeout_at,
};

use crate::{ServerState, pipeline::handle_request};

/// Run the DNS server over TCP.
pub async fn run_tcp<L, G>(bind_addr: SocketAddr, state: &Arc<ServerState<G, L>>) -> anyhow::Result<()>
where
    L: Default + Send + Sync + 'static,
    G: Send + Sync + 'static,
{
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("TCP listening on {}", bind_addr);

    loop {
        let (mut stream, client) = match listener.accept().await {
            Ok(conn) => conn,
            Err(e) => {
                tracing::warn!("TCP accept failed: {}", e);
                continue;
            }
        };

        let state = state.clone();

        tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + state.timeout;

            let bytes = match timeout_at(deadline, read_tcp_request(&mut stream)).await {
                Ok(Ok(bytes)) => bytes,
                Ok(Err(e)) => {
                    tracing::warn!("Failed to read request from client {}: {}", client, e);
                    return;
                }
                Err(_) => {
                    tracing::debug!("client {} did not send a request in time", client);
                    return;
                }
            };

            let ctx = DnsRequestCtx::new(
                state.timeout,
                RequestType::TCP,
                client,
                bytes,
                state.global.clone(),
                L::default(),
            );

            let stream = &mut stream;
            handle_request(&state, &ctx, |resp| async move { write_tcp_response(stream, &resp).await }).await;
        });
    }
}

/// Read one length-prefixed DNS message.
async fn read_tcp_request(stream: &mut TcpStream) -> anyhow::Result<Bytes> {
    let mut len_buf = [0u8; 2];
    stream.read_exact(&mut len_buf).await?;

    let buffer_length = u16::from_be_bytes(len_buf) as usize;
    let mut buf = vec![0; buffer_length];
    stream.read_exact(&mut buf).await?;

    Ok(Bytes::from(buf))
}

/// Write a DNS friendly response to a TCP stream.
async fn write_tcp_response(stream: &mut TcpStream, response: &Bytes) -> anyhow::Result<()> {
    anyhow::ensure!(
        response.len() <= u16::MAX as usize,
        "response too large for DNS/TCP: {}",
        response.len()
    );
    let len = response.len() as u16;

    stream.write_all(&len.to_be_bytes()).await?;
    stream.write_all(response).await?;

    Ok(())
}
