use std::{
    net::SocketAddr,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use anyhow::Context;
use bytes::{Bytes, BytesMut};
use crossbeam_queue::SegQueue;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    sync::{OwnedSemaphorePermit, Semaphore},
    time::{Duration, Instant, timeout, timeout_at},
};

use super::upstream::Limits;

/// Reusable TCP connections to one upstream.
///
/// Connections that answered cleanly go back to the idle queue until their TTL passes. The semaphore caps
/// every open connection, idle or busy.
pub(crate) struct TcpPool {
    pub addr: SocketAddr,
    limits: Limits,
    idle: SegQueue<TcpConn>,
    idle_len: AtomicUsize,
    slots: Arc<Semaphore>,
}

impl TcpPool {
    pub fn new(addr: SocketAddr, limits: Limits) -> Arc<Self> {
        Arc::new(Self {
            addr,
            limits,
            idle: SegQueue::new(),
            idle_len: AtomicUsize::new(0),
            slots: Arc::new(Semaphore::new(limits.max_tcp_connections)),
        })
    }

    /// Periodically close idle connections past their TTL.
    pub fn start_reaper(self: Arc<Self>, interval: Duration) {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let closed = self.reap(Instant::now());
                if closed > 0 {
                    tracing::debug!("closed {} expired tcp connections to {}", closed, self.addr);
                }
            }
        });
    }

    /// Drop idle connections that expired at `now`, returning how many were closed.
    fn reap(&self, now: Instant) -> usize {
        let mut closed = 0;
        for _ in 0..self.idle_len.load(Ordering::Relaxed) {
            let Some(conn) = self.pop_idle() else {
                break;
            };
            if conn.expired(now) {
                closed += 1;
            } else {
                self.push_idle(conn);
            }
        }
        closed
    }

    fn pop_idle(&self) -> Option<TcpConn> {
        let conn = self.idle.pop()?;
        self.idle_len.fetch_sub(1, Ordering::Relaxed);
        Some(conn)
    }

    fn push_idle(&self, conn: TcpConn) {
        self.idle.push(conn);
        self.idle_len.fetch_add(1, Ordering::Relaxed);
    }

    pub fn idle_len(&self) -> usize {
        self.idle_len.load(Ordering::Relaxed)
    }

    /// Take a live idle connection, or open a new one if a slot is free, before `deadline`.
    pub async fn checkout(&self, deadline: Instant) -> anyhow::Result<TcpConn> {
        let now = Instant::now();
        while let Some(conn) = self.pop_idle() {
            if !conn.expired(now) {
                return Ok(conn);
            }
        }

        let permit = self
            .slots
            .clone()
            .try_acquire_owned()
            .map_err(|_| anyhow::anyhow!("upstream {} has no free tcp connection slot", self.addr))?;

        timeout_at(
            deadline,
            TcpConn::connect(self.addr, self.limits.connect_timeout, permit, now + self.limits.tcp_ttl),
        )
        .await
        .context("deadline reached while connecting")?
    }

    /// Return a connection after use. Broken, expired and surplus connections are closed.
    pub fn checkin(&self, conn: TcpConn, healthy: bool) {
        if healthy && !conn.expired(Instant::now()) && self.idle_len() < self.limits.max_idle_tcp_connections {
            self.push_idle(conn);
        }
    }
}

/// One TCP connection to an upstream, holding a pool slot until dropped.
pub(crate) struct TcpConn {
    stream: TcpStream,
    _slot: OwnedSemaphorePermit,
    expires_at: Instant,
    buffer: BytesMut,
}

impl TcpConn {
    async fn connect(
        addr: SocketAddr,
        connect_timeout: Duration,
        slot: OwnedSemaphorePermit,
        expires_at: Instant,
    ) -> anyhow::Result<Self> {
        let stream = timeout(connect_timeout, TcpStream::connect(addr))
            .await
            .context("tcp connect timeout")??;

        // length prefix and body go out as separate small writes
        stream.set_nodelay(true)?;

        Ok(Self {
            stream,
            _slot: slot,
            expires_at,
            buffer: BytesMut::with_capacity(u16::MAX as usize),
        })
    }

    fn expired(&self, now: Instant) -> bool {
        self.expires_at <= now
    }

    /// Write one length-prefixed query and read back one length-prefixed response.
    pub async fn exchange(&mut self, query: &[u8], deadline: Instant) -> anyhow::Result<Bytes> {
        let len =
            u16::try_from(query.len()).map_err(|_| anyhow::anyhow!("query too large for DNS/TCP: {}", query.len()))?;

        timeout_at(deadline, self.stream.write_all(&len.to_be_bytes()))
            .await
            .context("write len timeout")??;
        timeout_at(deadline, self.stream.write_all(query))
            .await
            .context("write body timeout")??;

        let mut len_buf = [0u8; 2];
        timeout_at(deadline, self.stream.read_exact(&mut len_buf))
            .await
            .context("read len timeout")??;
        let n = u16::from_be_bytes(len_buf) as usize;
        anyhow::ensure!(n > 0, "upstream {} sent an empty tcp response", self.peer());

        self.buffer.clear();
        self.buffer.resize(n, 0);
        timeout_at(deadline, self.stream.read_exact(&mut self.buffer[..]))
            .await
            .context("read body timeout")??;

        Ok(self.buffer.split().freeze())
    }

    fn peer(&self) -> String {
        self.stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "<unknown>".into())
    }
}
