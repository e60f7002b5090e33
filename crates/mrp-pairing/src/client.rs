//! Controller-side handshakes.
//!
//! [`VerifyClient`] authenticates the proxy to the genuine device with stored
//! [`Credentials`]. [`SetupClient`] performs a full pair-setup against an
//! accessory and yields such credentials.

use crate::credentials::Credentials;
use crate::pair_setup::{PS_MSG05_NONCE, PS_MSG06_NONCE, SRP_USERNAME};
use crate::pair_verify::{PV_MSG02_NONCE, PV_MSG03_NONCE};
use mrp_core::error::{AuthFailure, CryptoError, ProtocolError, Result};
use mrp_crypto::{
    chacha::{decrypt_with_nonce, encrypt_with_nonce, nonce_from_string},
    curve25519::{EphemeralKeyPair, PUBLIC_KEY_LEN},
    ed25519::{self, LongTermKeyPair},
    hkdf,
    keys::{SessionKeys, SharedSecret},
    srp::{SrpChallenge, SrpClient, SrpProof, SALT_LEN},
    tlv::{Tlv8, TlvType},
};
use tracing::debug;

/// Check the response's sequence number and reject peer-reported errors.
fn expect_seq(response: &Tlv8, expected: u8) -> Result<()> {
    if let Some(code) = response.error() {
        return Err(AuthFailure::PeerRejected(code).into());
    }
    match response.seq_no() {
        Some(seq) if seq == expected => Ok(()),
        Some(seq) => Err(ProtocolError::OutOfOrder {
            expected,
            actual: seq,
        }
        .into()),
        None => Err(ProtocolError::MissingSeqNo.into()),
    }
}

fn require<'a>(tlv: &'a Tlv8, typ: TlvType) -> Result<&'a [u8]> {
    tlv.get(typ)
        .ok_or_else(|| ProtocolError::MissingTlv(typ as u8).into())
}

fn concat(parts: &[&[u8]]) -> Vec<u8> {
    parts.concat()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifyClientState {
    Initial,
    M1Sent,
    M3Sent,
    Complete,
    Failed,
}

/// Controller-side pair-verify (M1 to M4).
pub struct VerifyClient {
    credentials: Credentials,
    state: VerifyClientState,
    ephemeral: Option<EphemeralKeyPair>,
    client_public: [u8; 32],
    shared_secret: Option<SharedSecret>,
}

impl VerifyClient {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            state: VerifyClientState::Initial,
            ephemeral: None,
            client_public: [0u8; 32],
            shared_secret: None,
        }
    }

    pub fn state(&self) -> VerifyClientState {
        self.state
    }

    /// M1: `{seq=1, public key}` with a fresh ephemeral key.
    pub fn start(&mut self) -> Tlv8 {
        let ephemeral = EphemeralKeyPair::generate();
        self.client_public = ephemeral.public_key();
        self.ephemeral = Some(ephemeral);
        self.shared_secret = None;
        self.state = VerifyClientState::M1Sent;
        Tlv8::pair_verify_start(&self.client_public)
    }

    /// Process M2 and build M3.
    pub fn process_m2(&mut self, response: &Tlv8) -> Result<Tlv8> {
        if self.state != VerifyClientState::M1Sent {
            return Err(ProtocolError::UnexpectedMessage("pair-verify M2 before M1".to_string()).into());
        }
        let result = self.build_m3(response);
        if result.is_err() {
            self.state = VerifyClientState::Failed;
        }
        result
    }

    fn build_m3(&mut self, response: &Tlv8) -> Result<Tlv8> {
        expect_seq(response, 2)?;

        let device_public = require(response, TlvType::PublicKey)?;
        if device_public.len() != PUBLIC_KEY_LEN {
            return Err(CryptoError::InvalidKeyLength {
                expected: PUBLIC_KEY_LEN,
                actual: device_public.len(),
            }
            .into());
        }
        let encrypted = require(response, TlvType::EncryptedData)?;

        let ephemeral = self.ephemeral.take().ok_or_else(|| {
            ProtocolError::UnexpectedMessage("pair-verify M2 without ephemeral key".to_string())
        })?;
        let shared = ephemeral.agree(device_public)?;
        let verify_key = hkdf::derive_pair_verify_key(shared.as_bytes())?;

        let plaintext = decrypt_with_nonce(&verify_key, &nonce_from_string(PV_MSG02_NONCE), encrypted)
            .map_err(|_| AuthFailure::DecryptFailed("PV-Msg02"))?;
        let sub_tlv = Tlv8::parse(&plaintext)?;

        let identifier = require(&sub_tlv, TlvType::Identifier)?;
        if identifier != self.credentials.atv_id.as_slice() {
            return Err(AuthFailure::IdentifierMismatch.into());
        }
        let signature = require(&sub_tlv, TlvType::Signature)?;
        let device_info = concat(&[device_public, identifier, &self.client_public[..]]);
        ed25519::verify(&self.credentials.ltpk, &device_info, signature)
            .map_err(|_| AuthFailure::SignatureInvalid)?;
        debug!("device signature verified");

        let keypair = LongTermKeyPair::from_seed(&self.credentials.ltsk);
        let client_info = concat(&[&self.client_public[..], &self.credentials.client_id, device_public]);
        let our_signature = keypair.sign(&client_info);

        let sub_tlv = Tlv8::new()
            .with(TlvType::Identifier, self.credentials.client_id.clone())
            .with(TlvType::Signature, our_signature.to_vec());
        let encrypted = encrypt_with_nonce(
            &verify_key,
            &nonce_from_string(PV_MSG03_NONCE),
            &sub_tlv.encode(),
        )?;

        self.shared_secret = Some(shared);
        self.state = VerifyClientState::M3Sent;

        Ok(Tlv8::new()
            .with(TlvType::SeqNo, vec![0x03])
            .with(TlvType::EncryptedData, encrypted))
    }

    /// Process M4 and derive the controller's session keys.
    pub fn process_m4(&mut self, response: &Tlv8) -> Result<SessionKeys> {
        if self.state != VerifyClientState::M3Sent {
            return Err(ProtocolError::UnexpectedMessage("pair-verify M4 before M3".to_string()).into());
        }
        if let Err(e) = expect_seq(response, 4) {
            self.state = VerifyClientState::Failed;
            return Err(e);
        }

        let shared = self.shared_secret.take().ok_or_else(|| {
            ProtocolError::UnexpectedMessage("pair-verify M4 without shared secret".to_string())
        })?;
        let keys = SessionKeys::for_controller(&shared)?;
        self.state = VerifyClientState::Complete;
        Ok(keys)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupClientState {
    Initial,
    M1Sent,
    M3Sent,
    M5Sent,
    Complete,
    Failed,
}

/// Controller-side pair-setup (M1 to M6).
pub struct SetupClient {
    pin: String,
    client_id: Vec<u8>,
    keypair: LongTermKeyPair,
    state: SetupClientState,
    srp: Option<SrpClient>,
    proof: Option<SrpProof>,
}

impl SetupClient {
    pub fn new(pin: impl Into<String>, client_id: impl Into<Vec<u8>>, keypair: LongTermKeyPair) -> Self {
        Self {
            pin: pin.into(),
            client_id: client_id.into(),
            keypair,
            state: SetupClientState::Initial,
            srp: None,
            proof: None,
        }
    }

    pub fn state(&self) -> SetupClientState {
        self.state
    }

    /// M1: `{method=0, seq=1}`.
    pub fn start(&mut self) -> Tlv8 {
        self.srp = Some(SrpClient::new(SRP_USERNAME, self.pin.as_bytes()));
        self.proof = None;
        self.state = SetupClientState::M1Sent;
        Tlv8::pair_setup_start()
    }

    fn advance(&mut self, result: Result<Tlv8>, next: SetupClientState) -> Result<Tlv8> {
        match result {
            Ok(tlv) => {
                self.state = next;
                Ok(tlv)
            }
            Err(e) => {
                self.state = SetupClientState::Failed;
                Err(e)
            }
        }
    }

    fn ensure(&self, expected: SetupClientState, message: &str) -> Result<()> {
        if self.state != expected {
            return Err(ProtocolError::UnexpectedMessage(format!("pair-setup {} out of order", message)).into());
        }
        Ok(())
    }

    /// Process M2 (salt, B) and build M3 (A, M1).
    pub fn process_m2(&mut self, response: &Tlv8) -> Result<Tlv8> {
        self.ensure(SetupClientState::M1Sent, "M2")?;
        let result = self.build_m3(response);
        self.advance(result, SetupClientState::M3Sent)
    }

    fn build_m3(&mut self, response: &Tlv8) -> Result<Tlv8> {
        expect_seq(response, 2)?;
        let salt: [u8; SALT_LEN] = require(response, TlvType::Salt)?.try_into().map_err(|_| {
            ProtocolError::UnexpectedMessage("pair-setup salt has wrong length".to_string())
        })?;
        let server_public_key = require(response, TlvType::PublicKey)?.to_vec();

        let srp = self.srp.as_ref().ok_or_else(|| {
            ProtocolError::UnexpectedMessage("pair-setup M2 without SRP client".to_string())
        })?;
        let proof = srp.process_challenge(&SrpChallenge {
            salt,
            server_public_key,
        })?;

        let request = Tlv8::new()
            .with(TlvType::SeqNo, vec![0x03])
            .with(TlvType::PublicKey, srp.public_key())
            .with(TlvType::Proof, proof.client_proof.clone());
        self.proof = Some(proof);
        Ok(request)
    }

    /// Process M4 (server proof) and build M5 (encrypted controller info).
    pub fn process_m4(&mut self, response: &Tlv8) -> Result<Tlv8> {
        self.ensure(SetupClientState::M3Sent, "M4")?;
        let result = self.build_m5(response);
        self.advance(result, SetupClientState::M5Sent)
    }

    fn build_m5(&mut self, response: &Tlv8) -> Result<Tlv8> {
        expect_seq(response, 4)?;
        let server_proof = require(response, TlvType::Proof)?;

        let (srp, proof) = match (self.srp.as_ref(), self.proof.as_ref()) {
            (Some(srp), Some(proof)) => (srp, proof),
            _ => {
                return Err(ProtocolError::UnexpectedMessage(
                    "pair-setup M4 without SRP proof".to_string(),
                )
                .into())
            }
        };
        if !srp.verify_server_proof(server_proof, &proof.expected_server_proof) {
            return Err(AuthFailure::ProofMismatch.into());
        }

        let srp_key = proof.session_key.as_bytes();
        let controller_x = hkdf::derive_controller_sign_key(srp_key)?;
        let ltpk = self.keypair.public_key();
        let signature = self
            .keypair
            .sign(&concat(&[&controller_x[..], &self.client_id, &ltpk[..]]));

        let sub_tlv = Tlv8::new()
            .with(TlvType::Identifier, self.client_id.clone())
            .with(TlvType::PublicKey, ltpk.to_vec())
            .with(TlvType::Signature, signature.to_vec());
        let encrypt_key = hkdf::derive_pair_setup_key(srp_key)?;
        let encrypted = encrypt_with_nonce(
            &encrypt_key,
            &nonce_from_string(PS_MSG05_NONCE),
            &sub_tlv.encode(),
        )?;

        Ok(Tlv8::new()
            .with(TlvType::SeqNo, vec![0x05])
            .with(TlvType::EncryptedData, encrypted))
    }

    /// Process M6 and return credentials for later pair-verify.
    pub fn process_m6(&mut self, response: &Tlv8) -> Result<Credentials> {
        self.ensure(SetupClientState::M5Sent, "M6")?;
        match self.read_m6(response) {
            Ok(credentials) => {
                self.state = SetupClientState::Complete;
                self.srp = None;
                self.proof = None;
                Ok(credentials)
            }
            Err(e) => {
                self.state = SetupClientState::Failed;
                Err(e)
            }
        }
    }

    fn read_m6(&self, response: &Tlv8) -> Result<Credentials> {
        expect_seq(response, 6)?;
        let encrypted = require(response, TlvType::EncryptedData)?;

        let srp_key = self
            .proof
            .as_ref()
            .map(|proof| proof.session_key.as_bytes())
            .ok_or_else(|| {
                ProtocolError::UnexpectedMessage("pair-setup M6 without SRP proof".to_string())
            })?;

        let encrypt_key = hkdf::derive_pair_setup_key(srp_key)?;
        let plaintext = decrypt_with_nonce(&encrypt_key, &nonce_from_string(PS_MSG06_NONCE), encrypted)
            .map_err(|_| AuthFailure::DecryptFailed("PS-Msg06"))?;
        let sub_tlv = Tlv8::parse(&plaintext)?;

        let identifier = require(&sub_tlv, TlvType::Identifier)?;
        let ltpk = require(&sub_tlv, TlvType::PublicKey)?;
        let signature = require(&sub_tlv, TlvType::Signature)?;

        let accessory_x = hkdf::derive_accessory_sign_key(srp_key)?;
        ed25519::verify(ltpk, &concat(&[&accessory_x[..], identifier, ltpk]), signature)
            .map_err(|_| AuthFailure::SignatureInvalid)?;

        let ltpk: [u8; 32] = ltpk.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: ltpk.len(),
        })?;

        Ok(Credentials {
            ltpk,
            ltsk: self.keypair.seed(),
            atv_id: identifier.to_vec(),
            client_id: self.client_id.clone(),
        })
    }
}
