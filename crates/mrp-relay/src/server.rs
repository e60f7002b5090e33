//! App leg listener.

use crate::dispatch::{Dispatcher, ProxyContext};
use crate::traits::Accept;
use crate::upstream::UpstreamHandle;
use mrp_core::error::{Error, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream, ToSocketAddrs};
use tracing::{debug, info, warn};

const READ_BUF_LEN: usize = 8192;
const ACCEPT_BACKOFF: Duration = Duration::from_millis(50);

/// Accepts app connections and serves each on its own task.
pub struct RelayServer {
    listener: TcpListener,
    context: Arc<ProxyContext>,
    upstream: UpstreamHandle,
}

impl RelayServer {
    /// Bind the listener. The device leg must already be paired.
    pub async fn bind<A: ToSocketAddrs>(
        addr: A,
        context: Arc<ProxyContext>,
        upstream: UpstreamHandle,
    ) -> Result<Self> {
        let listener = TcpListener::bind(addr).await?;
        Ok(Self {
            listener,
            context,
            upstream,
        })
    }

    pub fn local_addr(&self) -> Result<SocketAddr> {
        Ok(self.listener.local_addr()?)
    }

    /// Accept connections until the device leg goes away.
    pub async fn run(self) -> Result<()> {
        info!(addr = %self.local_addr()?, "listening for apps");
        accept_loop(&self.listener, self.context, self.upstream).await
    }
}

/// Only the device leg closing ends the loop; accept failures are logged.
async fn accept_loop<L: Accept>(
    listener: &L,
    context: Arc<ProxyContext>,
    upstream: UpstreamHandle,
) -> Result<()> {
    loop {
        tokio::select! {
            biased;

            accepted = listener.accept() => match accepted {
                Ok((socket, peer)) => {
                    info!(%peer, "app connected");
                    let context = Arc::clone(&context);
                    let upstream = upstream.clone();
                    tokio::spawn(async move {
                        match serve(socket, context, upstream).await {
                            Ok(()) => info!(%peer, "app disconnected"),
                            Err(e) => warn!(%peer, error = %e, "app connection dropped"),
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "accept failed");
                    tokio::time::sleep(ACCEPT_BACKOFF).await;
                }
            },
            _ = upstream.closed() => {
                return Err(Error::UpstreamClosed);
            }
        }
    }
}

/// Relay one app connection until either side closes.
async fn serve(
    mut socket: TcpStream,
    context: Arc<ProxyContext>,
    upstream: UpstreamHandle,
) -> Result<()> {
    let mut device = upstream.subscribe();
    let mut dispatcher = Dispatcher::new(context, upstream.clone());
    let mut buf = [0u8; READ_BUF_LEN];

    loop {
        tokio::select! {
            read = socket.read(&mut buf) => {
                let n = read?;
                if n == 0 {
                    return Ok(());
                }
                let reply = dispatcher.on_app_bytes(&buf[..n]).await?;
                if !reply.is_empty() {
                    socket.write_all(&reply).await?;
                }
            }
            payload = device.recv() => match payload {
                Some(payload) => {
                    let framed = dispatcher.on_device_payload(&payload)?;
                    socket.write_all(&framed).await?;
                }
                None => return Err(Error::UpstreamClosed),
            },
            _ = upstream.closed() => {
                debug!("device leg closed, dropping app connection");
                return Err(Error::UpstreamClosed);
            }
        }
    }
}
