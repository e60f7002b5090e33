//! Seams around the relay: the device leg and the app listener.

use async_trait::async_trait;
use mrp_core::error::Result;
use std::io;
use std::net::SocketAddr;
use tokio::net::{TcpListener, TcpStream};

/// Destination for app messages that are relayed to the genuine device.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait Upstream: Send + Sync {
    /// Queue one plaintext payload for the device.
    async fn send(&self, payload: Vec<u8>) -> Result<()>;
}

/// Source of incoming app connections.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait Accept: Send + Sync {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)>;
}

#[async_trait]
impl Accept for TcpListener {
    async fn accept(&self) -> io::Result<(TcpStream, SocketAddr)> {
        TcpListener::accept(self).await
    }
}
