use std::net::SocketAddr;

use anyhow::Context;
use bytes::{Bytes, BytesMut};
use pfdns_dns::helpers;
use tokio::{net::UdpSocket, time::Instant};

/// A single UDP connection to an upstream server.
#[derive(Debug)]
pub(crate) struct UdpConn {
    pub socket: UdpSocket,
}

impl UdpConn {
    /// Create a new UDP connection to the specified upstream address utilizing source port randomization.
    pub async fn new(upstream_addr: SocketAddr) -> anyhow::Result<Self> {
        let bind_addr = if upstream_addr.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(upstream_addr).await?;
        Ok(Self { socket })
    }

    /// Send a DNS query and wait for the matching response, ignoring stray datagrams.
    pub async fn exchange(&self, query: &[u8], deadline: Instant) -> anyhow::Result<Bytes> {
        anyhow::ensure!(query.len() <= u16::MAX as usize, "query too large for DNS/UDP: {}", query.len());
        let want_id = helpers::extract_transaction_id(query).context("query has no transaction id")?;

        tokio::time::timeout_at(deadline, self.socket.send(query))
            .await
            .context("send timeout")??;

        // Upstreams answer up to the size the client advertised with EDNS.
        const MAX_BUFFER_SIZE: usize = u16::MAX as usize;
        let mut buf = BytesMut::with_capacity(MAX_BUFFER_SIZE);
        buf.resize(MAX_BUFFER_SIZE, 0);

        loop {
            let n = tokio::time::timeout_at(deadline, self.socket.recv(&mut buf))
                .await
                .context("recv timeout")??;

            if n >= 12 {
                let got_id = helpers::extract_transaction_id(&buf[..]).unwrap_or_default();
                let qr = (buf[2] & 0x80) != 0;
                if qr && got_id == want_id {
                    buf.truncate(n);
                    return Ok(buf.split().freeze());
                }
            }
        }
    }
}
