//! Device leg: the proxy's own connection to the genuine device.

use crate::codec::{self, Frame};
use crate::session::LegSession;
use crate::traits::Upstream;
use async_trait::async_trait;
use mrp_core::device::controller_device_info;
use mrp_core::error::{Error, Result};
use mrp_core::{ProtocolMessage, Route};
use mrp_crypto::tlv::Tlv8;
use mrp_pairing::{Credentials, VerifyClient};
use std::net::SocketAddr;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

const OUTBOUND_QUEUE: usize = 64;
pub(crate) const APP_QUEUE: usize = 256;
const READ_BUF_LEN: usize = 8192;

/// Paired, encrypted connection to the genuine device.
pub struct UpstreamConnection {
    stream: TcpStream,
    leg: LegSession,
    peer: SocketAddr,
}

impl UpstreamConnection {
    /// Connect and authenticate with stored credentials.
    ///
    /// Announces the proxy as a remote app, waits for the device's own
    /// device info, then runs pair-verify and switches on encryption.
    pub async fn connect(
        addr: SocketAddr,
        credentials: Credentials,
        name: &str,
        max_frame_len: usize,
    ) -> Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        info!(%addr, "connected to device");

        let client_id = String::from_utf8_lossy(&credentials.client_id).into_owned();
        let mut conn = Self {
            stream,
            leg: LegSession::with_max_frame_len(max_frame_len),
            peer: addr,
        };

        conn.send(&controller_device_info(name, &client_id)).await?;
        let info = conn.wait_for(Route::DeviceInfo).await?;
        if let Some(device) = info.message.device_info_message.as_ref() {
            info!(
                name = device.name.as_deref().unwrap_or("?"),
                build = device.system_build_version.as_deref().unwrap_or("?"),
                "device info received"
            );
        }

        let mut verify = VerifyClient::new(credentials);
        let m2 = conn.pair(verify.start()).await?;
        let m4 = conn.pair(verify.process_m2(&m2)?).await?;
        let keys = verify.process_m4(&m4)?;
        conn.leg.activate(&keys);
        info!("device leg paired");

        Ok(conn)
    }

    async fn send(&mut self, message: &ProtocolMessage) -> Result<()> {
        let framed = codec::encode(&mut self.leg, message)?;
        self.stream.write_all(&framed).await?;
        Ok(())
    }

    async fn read_frame(&mut self) -> Result<Frame> {
        let mut buf = [0u8; READ_BUF_LEN];
        loop {
            if let Some(frame) = codec::next_frame(&mut self.leg)? {
                return Ok(frame);
            }
            let n = self.stream.read(&mut buf).await?;
            if n == 0 {
                return Err(Error::UpstreamClosed);
            }
            self.leg.extend(&buf[..n]);
        }
    }

    /// Read until a message with the given route arrives, skipping others.
    async fn wait_for(&mut self, route: Route) -> Result<Frame> {
        loop {
            let frame = self.read_frame().await?;
            if frame.message.route() == route {
                return Ok(frame);
            }
            debug!(
                msg_type = frame.message.raw_type(),
                "skipping device message during handshake"
            );
        }
    }

    async fn pair(&mut self, request: Tlv8) -> Result<Tlv8> {
        self.send(&ProtocolMessage::crypto_pairing(request.encode()))
            .await?;
        let frame = self.wait_for(Route::CryptoPairing).await?;
        Ok(Tlv8::parse(frame.message.pairing_data()?)?)
    }

    /// Hand the connection to a background relay task.
    ///
    /// The task ends with [`Error::UpstreamClosed`] when the device hangs up.
    pub fn spawn(self) -> (UpstreamHandle, JoinHandle<Result<()>>) {
        let (tx, rx) = mpsc::channel(OUTBOUND_QUEUE);
        let (register, registrations) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.relay(rx, registrations));
        (UpstreamHandle::new(tx, register), task)
    }

    async fn relay(
        mut self,
        mut rx: mpsc::Receiver<Vec<u8>>,
        mut registrations: mpsc::UnboundedReceiver<mpsc::Sender<Vec<u8>>>,
    ) -> Result<()> {
        let mut subscribers: Vec<mpsc::Sender<Vec<u8>>> = Vec::new();
        let mut buf = [0u8; READ_BUF_LEN];
        loop {
            tokio::select! {
                biased;

                Some(subscriber) = registrations.recv() => {
                    subscribers.push(subscriber);
                    debug!(subscribers = subscribers.len(), "app subscribed to device leg");
                }
                outbound = rx.recv() => {
                    // The handle keeps a sender alive for as long as the server runs.
                    let Some(payload) = outbound else { return Ok(()) };
                    let framed = codec::encode_raw(&mut self.leg, &payload)?;
                    self.stream.write_all(&framed).await?;
                    debug!(len = payload.len(), "proxy -> device");
                }
                read = self.stream.read(&mut buf) => {
                    let n = read?;
                    if n == 0 {
                        warn!(peer = %self.peer, "device closed the connection");
                        return Err(Error::UpstreamClosed);
                    }
                    for payload in codec::decode_payloads(&mut self.leg, &buf[..n])? {
                        debug!(len = payload.len(), "device -> proxy");
                        fan_out(&mut subscribers, payload).await;
                    }
                }
            }
        }
    }
}

/// Deliver one payload to every live subscriber, waiting on full queues.
async fn fan_out(subscribers: &mut Vec<mpsc::Sender<Vec<u8>>>, payload: Vec<u8>) {
    let mut live = Vec::with_capacity(subscribers.len());
    for subscriber in subscribers.drain(..) {
        if subscriber.send(payload.clone()).await.is_ok() {
            live.push(subscriber);
        }
    }
    *subscribers = live;
}

/// Cloneable access to the device leg for app connections.
#[derive(Clone)]
pub struct UpstreamHandle {
    tx: mpsc::Sender<Vec<u8>>,
    register: mpsc::UnboundedSender<mpsc::Sender<Vec<u8>>>,
}

impl UpstreamHandle {
    pub(crate) fn new(
        tx: mpsc::Sender<Vec<u8>>,
        register: mpsc::UnboundedSender<mpsc::Sender<Vec<u8>>>,
    ) -> Self {
        Self { tx, register }
    }

    /// Queue of plaintext payloads arriving from the device from now on.
    ///
    /// Every payload is delivered; the relay waits while this queue is full.
    /// The receiver yields `None` once the relay has stopped.
    pub fn subscribe(&self) -> mpsc::Receiver<Vec<u8>> {
        let (tx, rx) = mpsc::channel(APP_QUEUE);
        if self.register.send(tx).is_err() {
            debug!("subscribed after the device leg closed");
        }
        rx
    }

    /// Resolves once the relay task has stopped.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

#[async_trait]
impl Upstream for UpstreamHandle {
    async fn send(&self, payload: Vec<u8>) -> Result<()> {
        self.tx
            .send(payload)
            .await
            .map_err(|_| Error::UpstreamClosed)
    }
}
