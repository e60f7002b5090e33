//! HKDF-SHA512 key derivation for pairing and session keys.

use mrp_core::error::CryptoError;

use hkdf::Hkdf;
use sha2::Sha512;

/// Derive `length` bytes using HKDF-SHA512.
pub fn derive_key(
    ikm: &[u8],
    salt: &[u8],
    info: &[u8],
    length: usize,
) -> Result<Vec<u8>, CryptoError> {
    let hk = Hkdf::<Sha512>::new(Some(salt), ikm);
    let mut okm = vec![0u8; length];
    hk.expand(info, &mut okm)
        .map_err(|_| CryptoError::KeyDerivation("HKDF expand failed".to_string()))?;
    Ok(okm)
}

/// Derive a 32-byte key.
pub fn derive_key_32(ikm: &[u8], salt: &[u8], info: &[u8]) -> Result<[u8; 32], CryptoError> {
    let hk = Hkdf::<Sha512>::new(Some(salt), ikm);
    let mut okm = [0u8; 32];
    hk.expand(info, &mut okm)
        .map_err(|_| CryptoError::KeyDerivation("HKDF expand failed".to_string()))?;
    Ok(okm)
}

/// Salt and info labels used by MRP pairing.
pub mod constants {
    pub const PAIR_SETUP_ENCRYPT_SALT: &[u8] = b"Pair-Setup-Encrypt-Salt";
    pub const PAIR_SETUP_ENCRYPT_INFO: &[u8] = b"Pair-Setup-Encrypt-Info";

    pub const PAIR_SETUP_ACCESSORY_SIGN_SALT: &[u8] = b"Pair-Setup-Accessory-Sign-Salt";
    pub const PAIR_SETUP_ACCESSORY_SIGN_INFO: &[u8] = b"Pair-Setup-Accessory-Sign-Info";

    pub const PAIR_SETUP_CONTROLLER_SIGN_SALT: &[u8] = b"Pair-Setup-Controller-Sign-Salt";
    pub const PAIR_SETUP_CONTROLLER_SIGN_INFO: &[u8] = b"Pair-Setup-Controller-Sign-Info";

    pub const PAIR_VERIFY_ENCRYPT_SALT: &[u8] = b"Pair-Verify-Encrypt-Salt";
    pub const PAIR_VERIFY_ENCRYPT_INFO: &[u8] = b"Pair-Verify-Encrypt-Info";

    pub const MEDIA_REMOTE_SALT: &[u8] = b"MediaRemote-Salt";
    /// Key the controller writes with.
    pub const MEDIA_REMOTE_WRITE_KEY_INFO: &[u8] = b"MediaRemote-Write-Encryption-Key";
    /// Key the accessory writes with.
    pub const MEDIA_REMOTE_READ_KEY_INFO: &[u8] = b"MediaRemote-Read-Encryption-Key";
}

/// Key encrypting the pair-setup exchange (steps 5 and 6).
pub fn derive_pair_setup_key(srp_key: &[u8]) -> Result<[u8; 32], CryptoError> {
    derive_key_32(
        srp_key,
        constants::PAIR_SETUP_ENCRYPT_SALT,
        constants::PAIR_SETUP_ENCRYPT_INFO,
    )
}

/// AccessoryX, prepended to the accessory's signed info.
pub fn derive_accessory_sign_key(srp_key: &[u8]) -> Result<[u8; 32], CryptoError> {
    derive_key_32(
        srp_key,
        constants::PAIR_SETUP_ACCESSORY_SIGN_SALT,
        constants::PAIR_SETUP_ACCESSORY_SIGN_INFO,
    )
}

/// iOSDeviceX, prepended to the controller's signed info.
pub fn derive_controller_sign_key(srp_key: &[u8]) -> Result<[u8; 32], CryptoError> {
    derive_key_32(
        srp_key,
        constants::PAIR_SETUP_CONTROLLER_SIGN_SALT,
        constants::PAIR_SETUP_CONTROLLER_SIGN_INFO,
    )
}

/// Key encrypting the pair-verify exchange.
pub fn derive_pair_verify_key(shared_secret: &[u8]) -> Result<[u8; 32], CryptoError> {
    derive_key_32(
        shared_secret,
        constants::PAIR_VERIFY_ENCRYPT_SALT,
        constants::PAIR_VERIFY_ENCRYPT_INFO,
    )
}

pub fn derive_media_remote_write_key(shared_secret: &[u8]) -> Result<[u8; 32], CryptoError> {
    derive_key_32(
        shared_secret,
        constants::MEDIA_REMOTE_SALT,
        constants::MEDIA_REMOTE_WRITE_KEY_INFO,
    )
}

pub fn derive_media_remote_read_key(shared_secret: &[u8]) -> Result<[u8; 32], CryptoError> {
    derive_key_32(
        shared_secret,
        constants::MEDIA_REMOTE_SALT,
        constants::MEDIA_REMOTE_READ_KEY_INFO,
    )
}
