//! Pair-setup, accessory side (steps 1, 3 and 5).
//!
//! The app proves knowledge of the PIN through SRP-6a; the proxy answers
//! with its own proof and then hands over its long-term public key, signed
//! and encrypted under a key derived from the SRP session key.

use crate::accessory::AccessoryIdentity;
use crate::config::PairingConfig;
use mrp_core::error::{AuthFailure, ProtocolError, Result};
use mrp_crypto::{
    chacha::{decrypt_with_nonce, encrypt_with_nonce, nonce_from_string},
    ed25519, hkdf,
    srp::{ProofVerdict, SrpServer},
    tlv::{Tlv8, TlvType},
};
use tracing::{debug, info};

/// SRP username fixed by the protocol.
pub const SRP_USERNAME: &[u8] = b"Pair-Setup";

pub(crate) const PS_MSG05_NONCE: &[u8] = b"PS-Msg05";
pub(crate) const PS_MSG06_NONCE: &[u8] = b"PS-Msg06";

/// Pair-setup request steps, by sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SetupStep {
    Start = 1,
    Proof = 3,
    Exchange = 5,
}

impl TryFrom<u8> for SetupStep {
    type Error = ProtocolError;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Start),
            3 => Ok(Self::Proof),
            5 => Ok(Self::Exchange),
            other => Err(ProtocolError::UnknownStep(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairSetupState {
    AwaitingStart,
    AwaitingProof,
    AwaitingExchange,
    Complete,
    Failed,
}

impl PairSetupState {
    fn expected_step(self) -> u8 {
        match self {
            Self::AwaitingProof => SetupStep::Proof as u8,
            Self::AwaitingExchange => SetupStep::Exchange as u8,
            Self::AwaitingStart | Self::Complete | Self::Failed => SetupStep::Start as u8,
        }
    }
}

/// One pair-setup attempt on an app connection.
pub struct PairSetupServer {
    state: PairSetupState,
    srp: Option<SrpServer>,
}

impl Default for PairSetupServer {
    fn default() -> Self {
        Self::new()
    }
}

impl PairSetupServer {
    pub fn new() -> Self {
        Self {
            state: PairSetupState::AwaitingStart,
            srp: None,
        }
    }

    pub fn state(&self) -> PairSetupState {
        self.state
    }

    fn expect(&self, wanted: PairSetupState, step: SetupStep) -> Result<()> {
        if self.state != wanted {
            return Err(ProtocolError::OutOfOrder {
                expected: self.state.expected_step(),
                actual: step as u8,
            }
            .into());
        }
        Ok(())
    }

    fn fail<E: Into<mrp_core::Error>>(&mut self, err: E) -> mrp_core::Error {
        self.state = PairSetupState::Failed;
        self.srp = None;
        err.into()
    }

    /// Step 1: answer with salt and SRP public value B.
    ///
    /// A new step 1 discards any attempt in progress.
    pub fn start(&mut self, config: &PairingConfig) -> Result<Tlv8> {
        let srp = SrpServer::new(
            SRP_USERNAME,
            config.pin.as_bytes(),
            config.salt,
            config.srp_private.as_deref(),
        );
        let challenge = srp.challenge();
        debug!(salt = %hex::encode(challenge.salt), "pair-setup started");

        self.srp = Some(srp);
        self.state = PairSetupState::AwaitingProof;

        Ok(Tlv8::new()
            .with(TlvType::Salt, challenge.salt.to_vec())
            .with(TlvType::PublicKey, challenge.server_public_key)
            .with(TlvType::SeqNo, vec![0x02]))
    }

    /// Step 3: check the app's proof M1 and answer with M2.
    pub fn verify_proof(&mut self, request: &Tlv8) -> Result<Tlv8> {
        self.expect(PairSetupState::AwaitingProof, SetupStep::Proof)?;

        let client_public = request
            .get(TlvType::PublicKey)
            .ok_or(ProtocolError::MissingTlv(TlvType::PublicKey as u8))
            .map_err(|e| self.fail(e))?
            .to_vec();
        let client_proof = request
            .get(TlvType::Proof)
            .ok_or(ProtocolError::MissingTlv(TlvType::Proof as u8))
            .map_err(|e| self.fail(e))?
            .to_vec();

        let verdict = match self.srp.as_mut() {
            Some(srp) => srp.verify_client(&client_public, &client_proof),
            None => {
                return Err(self.fail(ProtocolError::OutOfOrder {
                    expected: SetupStep::Start as u8,
                    actual: SetupStep::Proof as u8,
                }))
            }
        };

        match verdict.map_err(|e| self.fail(e))? {
            ProofVerdict::Accepted { server_proof } => {
                debug!("pair-setup proof accepted");
                self.state = PairSetupState::AwaitingExchange;
                Ok(Tlv8::new()
                    .with(TlvType::Proof, server_proof)
                    .with(TlvType::SeqNo, vec![0x04]))
            }
            ProofVerdict::Rejected(reason) => Err(self.fail(reason)),
        }
    }

    /// Step 5: hand over the accessory's signed long-term key.
    pub fn exchange(&mut self, request: &Tlv8, accessory: &AccessoryIdentity) -> Result<Tlv8> {
        self.expect(PairSetupState::AwaitingExchange, SetupStep::Exchange)?;

        let srp_key = match self.srp.as_ref().and_then(|srp| srp.session_key()) {
            Some(key) => key.as_bytes().to_vec(),
            None => {
                return Err(self.fail(ProtocolError::OutOfOrder {
                    expected: SetupStep::Proof as u8,
                    actual: SetupStep::Exchange as u8,
                }))
            }
        };

        let encrypt_key = hkdf::derive_pair_setup_key(&srp_key).map_err(|e| self.fail(e))?;

        if let Some(encrypted) = request.get(TlvType::EncryptedData) {
            self.check_controller(&srp_key, &encrypt_key, encrypted)
                .map_err(|e| self.fail(e))?;
        }

        let accessory_x = hkdf::derive_accessory_sign_key(&srp_key).map_err(|e| self.fail(e))?;
        let ltpk = accessory.ltpk();
        let signature = accessory.sign_with_id(&accessory_x, &ltpk);

        let sub_tlv = Tlv8::new()
            .with(TlvType::Identifier, accessory.device_id().as_bytes().to_vec())
            .with(TlvType::PublicKey, ltpk.to_vec())
            .with(TlvType::Signature, signature.to_vec());

        let encrypted = encrypt_with_nonce(
            &encrypt_key,
            &nonce_from_string(PS_MSG06_NONCE),
            &sub_tlv.encode(),
        )
        .map_err(|e| self.fail(e))?;

        self.state = PairSetupState::Complete;
        self.srp = None;
        info!("pair-setup complete");

        Ok(Tlv8::new()
            .with(TlvType::SeqNo, vec![0x06])
            .with(TlvType::EncryptedData, encrypted))
    }

    /// Decrypt the app's step 5 payload and check its signature when present.
    fn check_controller(&self, srp_key: &[u8], encrypt_key: &[u8; 32], encrypted: &[u8]) -> Result<()> {
        let plaintext = decrypt_with_nonce(encrypt_key, &nonce_from_string(PS_MSG05_NONCE), encrypted)
            .map_err(|_| AuthFailure::DecryptFailed("PS-Msg05"))?;
        let sub_tlv = Tlv8::parse(&plaintext)?;

        let identifier = sub_tlv.get(TlvType::Identifier).unwrap_or_default();
        info!(
            controller = %String::from_utf8_lossy(identifier),
            "controller identified during pair-setup"
        );

        if let (Some(ltpk), Some(signature)) = (
            sub_tlv.get(TlvType::PublicKey),
            sub_tlv.get(TlvType::Signature),
        ) {
            let controller_x = hkdf::derive_controller_sign_key(srp_key)?;
            let mut info = controller_x.to_vec();
            info.extend_from_slice(identifier);
            info.extend_from_slice(ltpk);
            ed25519::verify(ltpk, &info, signature).map_err(|_| AuthFailure::SignatureInvalid)?;
            debug!(ltpk = %hex::encode(ltpk), "controller signature verified");
        }

        Ok(())
    }
}
