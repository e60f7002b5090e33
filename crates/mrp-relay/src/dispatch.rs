//! Routing of app-leg traffic.
//!
//! Pairing messages are answered by the handshake machines, device-info
//! requests by the proxy itself, and everything else goes to the device.
//! Device traffic comes back through [`Dispatcher::on_device_payload`].

use crate::codec;
use crate::config::ProxyConfig;
use crate::session::LegSession;
use crate::traits::Upstream;
use mrp_core::error::Result;
use mrp_core::{DeviceIdentity, DeviceInfo, ProtocolMessage, Route};
use mrp_pairing::{AccessoryIdentity, Effect, PairingConfig, PairingSession};
use prost::Message;
use std::sync::Arc;
use tracing::{debug, warn};

/// Process-wide state shared by every app connection.
pub struct ProxyContext {
    pub accessory: Arc<AccessoryIdentity>,
    pub pairing: Arc<PairingConfig>,
    pub device_info: DeviceInfo,
    pub max_frame_len: usize,
}

impl ProxyContext {
    pub fn new(identity: DeviceIdentity, pairing: PairingConfig) -> Self {
        let accessory = AccessoryIdentity::from_config(identity.clone(), &pairing);
        Self {
            accessory: Arc::new(accessory),
            pairing: Arc::new(pairing),
            device_info: DeviceInfo::media_device(identity),
            max_frame_len: crate::session::DEFAULT_MAX_FRAME_LEN,
        }
    }

    pub fn from_config(config: &ProxyConfig) -> Self {
        let mut context = Self::new(config.identifier.clone(), config.pairing.clone());
        context.device_info = context
            .device_info
            .with_name(config.name.clone())
            .with_build(config.build.clone());
        context.max_frame_len = config.max_frame_len;
        context
    }
}

/// App-leg state for one connection.
pub struct Dispatcher<U: Upstream> {
    context: Arc<ProxyContext>,
    upstream: U,
    leg: LegSession,
    pairing: PairingSession,
}

impl<U: Upstream> Dispatcher<U> {
    pub fn new(context: Arc<ProxyContext>, upstream: U) -> Self {
        let pairing = PairingSession::new(context.accessory.clone(), context.pairing.clone());
        let leg = LegSession::with_max_frame_len(context.max_frame_len);
        Self {
            context,
            upstream,
            leg,
            pairing,
        }
    }

    pub fn leg(&self) -> &LegSession {
        &self.leg
    }

    /// Handle bytes read from the app. Returns bytes to write back to it.
    ///
    /// Frames are taken one at a time so that a cipher switched on by one
    /// frame applies to the frames after it.
    pub async fn on_app_bytes(&mut self, bytes: &[u8]) -> Result<Vec<u8>> {
        self.leg.extend(bytes);
        let mut out = Vec::new();

        while let Some(frame) = codec::next_frame(&mut self.leg)? {
            debug!(
                msg_type = frame.message.raw_type(),
                len = frame.raw.len(),
                "app -> proxy"
            );

            match frame.message.route() {
                Route::CryptoPairing => {
                    let data = frame.message.pairing_data()?;
                    let outcome = self.pairing.handle(data, self.leg.is_paired())?;
                    let reply = ProtocolMessage::crypto_pairing(outcome.response.encode());
                    out.extend(codec::encode(&mut self.leg, &reply)?);

                    match outcome.effect {
                        Effect::None => {}
                        Effect::Paired => self.leg.mark_paired(),
                        Effect::Activate(keys) => self.leg.activate(&keys),
                    }
                }
                Route::DeviceInfo => {
                    let reply = self.context.device_info.response_to(&frame.message);
                    out.extend(codec::encode(&mut self.leg, &reply)?);
                }
                Route::Forward => {
                    self.upstream.send(frame.raw).await?;
                }
            }
        }

        Ok(out)
    }

    /// Re-frame a plaintext device payload for the app.
    ///
    /// The payload is parsed for logging only; one that fails to parse is
    /// still forwarded.
    pub fn on_device_payload(&mut self, payload: &[u8]) -> Result<Vec<u8>> {
        match ProtocolMessage::decode(payload) {
            Ok(message) => debug!(
                msg_type = message.raw_type(),
                len = payload.len(),
                "device -> app"
            ),
            Err(e) => warn!(
                error = %e,
                payload = %hex::encode(payload),
                "forwarding undecodable device message"
            ),
        }
        codec::encode_raw(&mut self.leg, payload)
    }
}
