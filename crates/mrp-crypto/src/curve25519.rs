//! X25519 key agreement for pair-verify.

use crate::keys::SharedSecret;
use mrp_core::error::CryptoError;
use rand::rngs::OsRng;
use x25519_dalek::{PublicKey, StaticSecret};
use zeroize::ZeroizeOnDrop;

/// Length of an X25519 public value.
pub const PUBLIC_KEY_LEN: usize = 32;

/// Curve25519 key pair used for a single verify exchange.
#[derive(ZeroizeOnDrop)]
pub struct EphemeralKeyPair {
    #[zeroize(skip)]
    public: [u8; 32],
    secret: [u8; 32],
}

impl EphemeralKeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let secret = StaticSecret::random_from_rng(OsRng);
        let public = PublicKey::from(&secret);
        Self {
            public: public.to_bytes(),
            secret: secret.to_bytes(),
        }
    }

    /// Key pair from fixed secret bytes.
    pub fn from_secret(secret: &[u8; 32]) -> Self {
        let static_secret = StaticSecret::from(*secret);
        let public = PublicKey::from(&static_secret);
        Self {
            public: public.to_bytes(),
            secret: *secret,
        }
    }

    /// Use `seed` when injected, otherwise a fresh random pair.
    pub fn from_seed_or_random(seed: Option<&[u8; 32]>) -> Self {
        match seed {
            Some(secret) => Self::from_secret(secret),
            None => Self::generate(),
        }
    }

    pub fn public_key(&self) -> [u8; 32] {
        self.public
    }

    /// Agree on a shared secret with the peer's public value.
    ///
    /// Rejects keys of the wrong length, the all-zero key, and low-order
    /// points (which yield an all-zero secret).
    pub fn agree(self, peer_public: &[u8]) -> Result<SharedSecret, CryptoError> {
        let peer: [u8; 32] =
            peer_public
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: PUBLIC_KEY_LEN,
                    actual: peer_public.len(),
                })?;

        if peer.iter().all(|&b| b == 0) {
            return Err(CryptoError::InvalidPublicKey("all zeros".to_string()));
        }

        let static_secret = StaticSecret::from(self.secret);
        let shared = static_secret.diffie_hellman(&PublicKey::from(peer));

        let shared_bytes = shared.to_bytes();
        if shared_bytes.iter().all(|&b| b == 0) {
            return Err(CryptoError::InvalidPublicKey(
                "low-order point yields zero secret".to_string(),
            ));
        }

        Ok(SharedSecret::new(shared_bytes.to_vec()))
    }
}
