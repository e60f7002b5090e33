//! Pair-verify, accessory side (steps 1 and 3).
//!
//! Establishes the session keys for an app connection with an X25519
//! exchange authenticated by the accessory's long-term key.

use crate::accessory::AccessoryIdentity;
use crate::config::PairingConfig;
use mrp_core::error::{AuthFailure, CryptoError, ProtocolError, Result};
use mrp_crypto::{
    chacha::{decrypt_with_nonce, encrypt_with_nonce, nonce_from_string},
    curve25519::{EphemeralKeyPair, PUBLIC_KEY_LEN},
    hkdf,
    keys::{SessionKeys, SharedSecret},
    tlv::{Tlv8, TlvType},
};
use tracing::{debug, info};

pub(crate) const PV_MSG02_NONCE: &[u8] = b"PV-Msg02";
pub(crate) const PV_MSG03_NONCE: &[u8] = b"PV-Msg03";

/// Pair-verify request steps, by sequence number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VerifyStep {
    Start = 1,
    Finish = 3,
}

impl TryFrom<u8> for VerifyStep {
    type Error = ProtocolError;

    fn try_from(value: u8) -> std::result::Result<Self, Self::Error> {
        match value {
            1 => Ok(Self::Start),
            3 => Ok(Self::Finish),
            other => Err(ProtocolError::UnknownStep(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairVerifyState {
    AwaitingStart,
    AwaitingFinish,
    Complete,
    Failed,
}

/// One pair-verify attempt on an app connection.
pub struct PairVerifyServer {
    state: PairVerifyState,
    shared_secret: Option<SharedSecret>,
    verify_key: Option<[u8; 32]>,
}

impl Default for PairVerifyServer {
    fn default() -> Self {
        Self::new()
    }
}

impl PairVerifyServer {
    pub fn new() -> Self {
        Self {
            state: PairVerifyState::AwaitingStart,
            shared_secret: None,
            verify_key: None,
        }
    }

    pub fn state(&self) -> PairVerifyState {
        self.state
    }

    fn fail<E: Into<mrp_core::Error>>(&mut self, err: E) -> mrp_core::Error {
        self.state = PairVerifyState::Failed;
        self.shared_secret = None;
        self.verify_key = None;
        err.into()
    }

    /// Step 1: agree on a secret and prove the accessory's identity.
    pub fn start(
        &mut self,
        request: &Tlv8,
        accessory: &AccessoryIdentity,
        config: &PairingConfig,
    ) -> Result<Tlv8> {
        let client_public = request
            .get(TlvType::PublicKey)
            .ok_or(ProtocolError::MissingTlv(TlvType::PublicKey as u8))
            .map_err(|e| self.fail(e))?
            .to_vec();
        if client_public.len() != PUBLIC_KEY_LEN {
            return Err(self.fail(CryptoError::InvalidKeyLength {
                expected: PUBLIC_KEY_LEN,
                actual: client_public.len(),
            }));
        }

        let ephemeral = EphemeralKeyPair::from_seed_or_random(config.verify_seed.as_ref());
        let server_public = ephemeral.public_key();
        let shared = ephemeral.agree(&client_public).map_err(|e| self.fail(e))?;
        let verify_key =
            hkdf::derive_pair_verify_key(shared.as_bytes()).map_err(|e| self.fail(e))?;

        let signature = accessory.sign_with_id(&server_public, &client_public);
        let sub_tlv = Tlv8::new()
            .with(TlvType::Identifier, accessory.device_id().as_bytes().to_vec())
            .with(TlvType::Signature, signature.to_vec());

        let encrypted = encrypt_with_nonce(
            &verify_key,
            &nonce_from_string(PV_MSG02_NONCE),
            &sub_tlv.encode(),
        )
        .map_err(|e| self.fail(e))?;

        debug!(
            client_public = %hex::encode(&client_public),
            server_public = %hex::encode(server_public),
            "pair-verify started"
        );

        self.shared_secret = Some(shared);
        self.verify_key = Some(verify_key);
        self.state = PairVerifyState::AwaitingFinish;

        Ok(Tlv8::new()
            .with(TlvType::SeqNo, vec![0x02])
            .with(TlvType::PublicKey, server_public.to_vec())
            .with(TlvType::EncryptedData, encrypted))
    }

    /// Step 3: accept the app's acknowledgement and derive the session keys.
    ///
    /// The `{seq=4}` reply must go out in plaintext before the keys are used.
    pub fn finish(&mut self, request: &Tlv8) -> Result<(Tlv8, SessionKeys)> {
        if self.state != PairVerifyState::AwaitingFinish {
            return Err(ProtocolError::OutOfOrder {
                expected: VerifyStep::Start as u8,
                actual: VerifyStep::Finish as u8,
            }
            .into());
        }

        let (shared, verify_key) = match (self.shared_secret.take(), self.verify_key.take()) {
            (Some(shared), Some(key)) => (shared, key),
            _ => {
                return Err(self.fail(ProtocolError::OutOfOrder {
                    expected: VerifyStep::Start as u8,
                    actual: VerifyStep::Finish as u8,
                }))
            }
        };

        if let Some(encrypted) = request.get(TlvType::EncryptedData) {
            let plaintext =
                decrypt_with_nonce(&verify_key, &nonce_from_string(PV_MSG03_NONCE), encrypted)
                    .map_err(|_| self.fail(AuthFailure::DecryptFailed("PV-Msg03")))?;
            let sub_tlv = Tlv8::parse(&plaintext).map_err(|e| self.fail(e))?;
            if let Some(identifier) = sub_tlv.get(TlvType::Identifier) {
                info!(
                    controller = %String::from_utf8_lossy(identifier),
                    "controller identified during pair-verify"
                );
            }
        }

        let keys = SessionKeys::for_accessory(&shared).map_err(|e| self.fail(e))?;
        self.state = PairVerifyState::Complete;
        info!("pair-verify complete");

        Ok((Tlv8::new().with(TlvType::SeqNo, vec![0x04]), keys))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::VerifyClient;
    use crate::credentials::Credentials;
    use mrp_core::{DeviceIdentity, Error};
    use mrp_crypto::chacha::SessionCipher;
    use mrp_crypto::ed25519::LongTermKeyPair;

    fn accessory() -> AccessoryIdentity {
        AccessoryIdentity::from_config(DeviceIdentity::new("ATV-ID"), &PairingConfig::default())
    }

    fn credentials_for(identity: &AccessoryIdentity) -> Credentials {
        Credentials {
            ltpk: identity.ltpk(),
            ltsk: LongTermKeyPair::from_seed(&[0x07; 32]).seed(),
            atv_id: identity.device_id().as_bytes().to_vec(),
            client_id: b"client-1".to_vec(),
        }
    }

    mod steps {
        use super::*;

        #[test]
        fn step_numbers_map_to_steps() {
            assert_eq!(VerifyStep::try_from(1u8), Ok(VerifyStep::Start));
            assert_eq!(VerifyStep::try_from(3u8), Ok(VerifyStep::Finish));
            assert_eq!(VerifyStep::try_from(5u8), Err(ProtocolError::UnknownStep(5)));
        }
    }

    mod start {
        use super::*;

        #[test]
        fn answers_with_public_value_and_encrypted_proof() {
            let mut server = PairVerifyServer::new();
            let request = Tlv8::pair_verify_start(&[0x09; 32]);
            let response = server
                .start(&request, &accessory(), &PairingConfig::default())
                .unwrap();

            assert_eq!(response.seq_no(), Some(2));
            assert_eq!(response.get(TlvType::PublicKey).unwrap().len(), 32);
            // Identifier (2 + 6) and Signature (2 + 64), plus the tag.
            assert_eq!(
                response.get(TlvType::EncryptedData).unwrap().len(),
                8 + 66 + 16
            );
            assert_eq!(server.state(), PairVerifyState::AwaitingFinish);
        }

        #[test]
        fn injected_seed_fixes_public_value() {
            let config = PairingConfig::default().with_verify_seed([0x01; 32]);
            let request = Tlv8::pair_verify_start(&[0x09; 32]);

            let a = PairVerifyServer::new()
                .start(&request, &accessory(), &config)
                .unwrap();
            let b = PairVerifyServer::new()
                .start(&request, &accessory(), &config)
                .unwrap();
            assert_eq!(a.get(TlvType::PublicKey), b.get(TlvType::PublicKey));
        }

        #[test]
        fn short_public_key_is_rejected() {
            let mut server = PairVerifyServer::new();
            let request = Tlv8::new()
                .with(TlvType::SeqNo, vec![1])
                .with(TlvType::PublicKey, vec![0x09; 16]);
            let err = server
                .start(&request, &accessory(), &PairingConfig::default())
                .unwrap_err();
            assert!(matches!(
                err,
                Error::Crypto(CryptoError::InvalidKeyLength { actual: 16, .. })
            ));
            assert_eq!(server.state(), PairVerifyState::Failed);
        }
    }

    mod finish {
        use super::*;

        #[test]
        fn finish_before_start_is_out_of_order() {
            let mut server = PairVerifyServer::new();
            let err = server.finish(&Tlv8::new()).err().unwrap();
            assert!(matches!(
                err,
                Error::Protocol(ProtocolError::OutOfOrder {
                    expected: 1,
                    actual: 3
                })
            ));
        }

        #[test]
        fn undecryptable_payload_is_authentication_failure() {
            let mut server = PairVerifyServer::new();
            server
                .start(
                    &Tlv8::pair_verify_start(&[0x09; 32]),
                    &accessory(),
                    &PairingConfig::default(),
                )
                .unwrap();

            let request = Tlv8::new()
                .with(TlvType::SeqNo, vec![3])
                .with(TlvType::EncryptedData, vec![0x00; 40]);
            let err = server.finish(&request).err().unwrap();
            assert!(matches!(
                err,
                Error::Authentication(AuthFailure::DecryptFailed("PV-Msg03"))
            ));
            assert_eq!(server.state(), PairVerifyState::Failed);
        }

        #[test]
        fn keys_mirror_the_client() {
            let identity = accessory();
            let mut server = PairVerifyServer::new();
            let mut client = VerifyClient::new(credentials_for(&identity));

            let m1 = client.start();
            let m2 = server
                .start(&m1, &identity, &PairingConfig::default())
                .unwrap();
            let m3 = client.process_m2(&m2).unwrap();
            let (m4, server_keys) = server.finish(&m3).unwrap();
            assert_eq!(m4.seq_no(), Some(4));
            assert!(!m4.contains(TlvType::EncryptedData));

            let client_keys = client.process_m4(&m4).unwrap();
            let mut server_cipher = SessionCipher::from_keys(&server_keys);
            let mut client_cipher = SessionCipher::from_keys(&client_keys);

            let sealed = client_cipher.encrypt(b"play").unwrap();
            assert_eq!(server_cipher.decrypt(&sealed).unwrap(), b"play");
            let sealed = server_cipher.encrypt(b"now playing").unwrap();
            assert_eq!(client_cipher.decrypt(&sealed).unwrap(), b"now playing");
        }
    }
}
