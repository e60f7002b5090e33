//! Ed25519 long-term keys (LTPK/LTSK) for pairing signatures.

use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use mrp_core::error::CryptoError;
use rand::rngs::OsRng;
use zeroize::ZeroizeOnDrop;

/// Long-term Ed25519 key pair.
///
/// The proxy holds one for the lifetime of the process and presents it to
/// every app connection; the upstream leg holds the one from the stored
/// credentials.
#[derive(Clone, ZeroizeOnDrop)]
pub struct LongTermKeyPair {
    #[zeroize(skip)]
    public: [u8; 32],
    seed: [u8; 32],
}

impl LongTermKeyPair {
    /// Generate a new random key pair.
    pub fn generate() -> Self {
        let signing_key = SigningKey::generate(&mut OsRng);
        Self {
            public: signing_key.verifying_key().to_bytes(),
            seed: signing_key.to_bytes(),
        }
    }

    /// Key pair from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        Self {
            public: signing_key.verifying_key().to_bytes(),
            seed: *seed,
        }
    }

    /// Public key (LTPK).
    pub fn public_key(&self) -> [u8; 32] {
        self.public
    }

    /// Seed (LTSK) for storage.
    pub fn seed(&self) -> [u8; 32] {
        self.seed
    }

    pub fn sign(&self, message: &[u8]) -> [u8; 64] {
        SigningKey::from_bytes(&self.seed).sign(message).to_bytes()
    }
}

/// Verify a detached signature made by `public_key`.
pub fn verify(public_key: &[u8], message: &[u8], signature: &[u8]) -> Result<(), CryptoError> {
    let public_key: [u8; 32] = public_key
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: public_key.len(),
        })?;
    let signature: [u8; 64] = signature
        .try_into()
        .map_err(|_| CryptoError::SignatureInvalid)?;

    let verifying_key = VerifyingKey::from_bytes(&public_key)
        .map_err(|e| CryptoError::InvalidPublicKey(e.to_string()))?;

    verifying_key
        .verify(message, &Signature::from_bytes(&signature))
        .map_err(|_| CryptoError::SignatureInvalid)
}
