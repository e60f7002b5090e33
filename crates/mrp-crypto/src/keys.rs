//! Session key types and derivation.

use crate::hkdf;
use mrp_core::error::CryptoError;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Shared secret from SRP or ECDH.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SharedSecret(Vec<u8>);

/// 32-byte symmetric key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; 32]);

/// Directional keys for one leg once pair-verify completes.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SessionKeys {
    /// Encrypts what we send.
    pub write_key: EncryptionKey,
    /// Decrypts what we receive.
    pub read_key: EncryptionKey,
}

impl SharedSecret {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl EncryptionKey {
    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl SessionKeys {
    /// Keys for the accessory side (the proxy facing the app).
    ///
    /// The accessory writes with the `Read` key and reads with the `Write`
    /// key; the labels are named from the controller's point of view.
    pub fn for_accessory(shared_secret: &SharedSecret) -> Result<Self, CryptoError> {
        Ok(Self {
            write_key: EncryptionKey(hkdf::derive_media_remote_read_key(
                shared_secret.as_bytes(),
            )?),
            read_key: EncryptionKey(hkdf::derive_media_remote_write_key(
                shared_secret.as_bytes(),
            )?),
        })
    }

    /// Keys for the controller side (the proxy facing the genuine device).
    pub fn for_controller(shared_secret: &SharedSecret) -> Result<Self, CryptoError> {
        Ok(Self {
            write_key: EncryptionKey(hkdf::derive_media_remote_write_key(
                shared_secret.as_bytes(),
            )?),
            read_key: EncryptionKey(hkdf::derive_media_remote_read_key(
                shared_secret.as_bytes(),
            )?),
        })
    }
}
