//! Per-connection handshake routing.
//!
//! Decides whether a pairing message belongs to pair-setup or pair-verify
//! and reports what the connection must do once the reply is written.

use crate::accessory::AccessoryIdentity;
use crate::config::PairingConfig;
use crate::pair_setup::{PairSetupServer, SetupStep};
use crate::pair_verify::{PairVerifyServer, VerifyStep};
use mrp_core::error::{AuthFailure, ProtocolError, Result};
use mrp_crypto::{
    curve25519::PUBLIC_KEY_LEN,
    keys::SessionKeys,
    tlv::{Tlv8, TlvType},
};
use std::sync::Arc;
use tracing::debug;

/// Follow-up for the connection after a handshake reply is sent.
pub enum Effect {
    None,
    /// Pair-setup finished; mark the connection paired.
    Paired,
    /// Pair-verify finished; encrypt everything after this reply.
    Activate(SessionKeys),
}

/// Reply to one handshake message.
pub struct StepOutcome {
    pub response: Tlv8,
    pub effect: Effect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Handshake {
    Setup,
    Verify,
}

/// Handshake state for one app connection.
pub struct PairingSession {
    accessory: Arc<AccessoryIdentity>,
    config: Arc<PairingConfig>,
    active: Option<Handshake>,
    setup: PairSetupServer,
    verify: PairVerifyServer,
}

impl PairingSession {
    pub fn new(accessory: Arc<AccessoryIdentity>, config: Arc<PairingConfig>) -> Self {
        Self {
            accessory,
            config,
            active: None,
            setup: PairSetupServer::new(),
            verify: PairVerifyServer::new(),
        }
    }

    /// Handle the TLV8 payload of a crypto pairing message.
    ///
    /// `paired` is the connection's paired flag; once set, a new step 1 is
    /// treated as pair-verify.
    pub fn handle(&mut self, pairing_data: &[u8], paired: bool) -> Result<StepOutcome> {
        let request = Tlv8::parse(pairing_data)?;
        if let Some(code) = request.error() {
            return Err(AuthFailure::PeerRejected(code).into());
        }
        let seq = request.seq_no().ok_or(ProtocolError::MissingSeqNo)?;

        let handshake = if seq == SetupStep::Start as u8 {
            if paired || looks_like_verify(&request) {
                Handshake::Verify
            } else {
                Handshake::Setup
            }
        } else {
            self.active.unwrap_or(Handshake::Setup)
        };
        self.active = Some(handshake);
        debug!(?handshake, seq, "pairing message");

        match handshake {
            Handshake::Setup => self.handle_setup(SetupStep::try_from(seq)?, &request),
            Handshake::Verify => self.handle_verify(VerifyStep::try_from(seq)?, &request),
        }
    }

    fn handle_setup(&mut self, step: SetupStep, request: &Tlv8) -> Result<StepOutcome> {
        let (response, effect) = match step {
            SetupStep::Start => (self.setup.start(&self.config)?, Effect::None),
            SetupStep::Proof => (self.setup.verify_proof(request)?, Effect::None),
            SetupStep::Exchange => (
                self.setup.exchange(request, &self.accessory)?,
                Effect::Paired,
            ),
        };
        Ok(StepOutcome { response, effect })
    }

    fn handle_verify(&mut self, step: VerifyStep, request: &Tlv8) -> Result<StepOutcome> {
        match step {
            VerifyStep::Start => {
                self.verify = PairVerifyServer::new();
                let response = self.verify.start(request, &self.accessory, &self.config)?;
                Ok(StepOutcome {
                    response,
                    effect: Effect::None,
                })
            }
            VerifyStep::Finish => {
                let (response, keys) = self.verify.finish(request)?;
                Ok(StepOutcome {
                    response,
                    effect: Effect::Activate(keys),
                })
            }
        }
    }
}

/// A step 1 carrying a curve public key and no method resumes an earlier pairing.
fn looks_like_verify(request: &Tlv8) -> bool {
    !request.contains(TlvType::Method)
        && request
            .get(TlvType::PublicKey)
            .is_some_and(|pk| pk.len() == PUBLIC_KEY_LEN)
}
