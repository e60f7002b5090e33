//! ChaCha20-Poly1305 AEAD for session frames and handshake payloads.

use crate::keys::SessionKeys;
use chacha20poly1305::{
    aead::{Aead, KeyInit},
    ChaCha20Poly1305, Nonce,
};
use mrp_core::error::CryptoError;
use zeroize::ZeroizeOnDrop;

/// Poly1305 tag length.
pub const TAG_LEN: usize = 16;

/// Per-leg session cipher with a message counter for each direction.
///
/// Frames carry no AAD. The nonce for message `n` in a direction is four
/// zero bytes followed by `n` as a little-endian u64.
#[derive(ZeroizeOnDrop)]
pub struct SessionCipher {
    write_key: [u8; 32],
    read_key: [u8; 32],
    #[zeroize(skip)]
    write_cipher: ChaCha20Poly1305,
    #[zeroize(skip)]
    read_cipher: ChaCha20Poly1305,
    #[zeroize(skip)]
    encrypt_counter: u64,
    #[zeroize(skip)]
    decrypt_counter: u64,
}

impl SessionCipher {
    /// Cipher writing with `write_key` and reading with `read_key`.
    pub fn new(write_key: [u8; 32], read_key: [u8; 32]) -> Self {
        Self {
            write_cipher: ChaCha20Poly1305::new(&write_key.into()),
            read_cipher: ChaCha20Poly1305::new(&read_key.into()),
            write_key,
            read_key,
            encrypt_counter: 0,
            decrypt_counter: 0,
        }
    }

    pub fn from_keys(keys: &SessionKeys) -> Self {
        Self::new(*keys.write_key.as_bytes(), *keys.read_key.as_bytes())
    }

    /// Seal one outbound payload. Returns ciphertext with the tag appended.
    pub fn encrypt(&mut self, plaintext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        let nonce = build_nonce_from_counter(self.encrypt_counter);
        let sealed = self
            .write_cipher
            .encrypt(Nonce::from_slice(&nonce), plaintext)
            .map_err(|e| CryptoError::Encryption(format!("Encryption failed: {}", e)))?;
        self.encrypt_counter += 1;
        Ok(sealed)
    }

    /// Open one inbound payload. The counter only advances on success.
    pub fn decrypt(&mut self, ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.len() < TAG_LEN {
            return Err(CryptoError::Decryption(
                "Ciphertext too short (missing tag)".to_string(),
            ));
        }

        let nonce = build_nonce_from_counter(self.decrypt_counter);
        let plaintext = self
            .read_cipher
            .decrypt(Nonce::from_slice(&nonce), ciphertext)
            .map_err(|_| {
                CryptoError::Decryption("Decryption/authentication failed".to_string())
            })?;
        self.decrypt_counter += 1;
        Ok(plaintext)
    }

    pub fn encrypt_counter(&self) -> u64 {
        self.encrypt_counter
    }

    pub fn decrypt_counter(&self) -> u64 {
        self.decrypt_counter
    }
}

/// Build a 12-byte nonce from a message counter.
fn build_nonce_from_counter(counter: u64) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    nonce[4..12].copy_from_slice(&counter.to_le_bytes());
    nonce
}

/// Encrypt a handshake payload under a label nonce.
///
/// Returns ciphertext with the 16-byte tag appended.
pub fn encrypt_with_nonce(
    key: &[u8; 32],
    nonce: &[u8; 12],
    plaintext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    let cipher = ChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| CryptoError::Encryption(format!("Invalid key: {}", e)))?;

    cipher
        .encrypt(Nonce::from_slice(nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(format!("Encryption failed: {}", e)))
}

/// Decrypt a handshake payload sealed under a label nonce.
pub fn decrypt_with_nonce(
    key: &[u8; 32],
    nonce: &[u8; 12],
    ciphertext: &[u8],
) -> Result<Vec<u8>, CryptoError> {
    if ciphertext.len() < TAG_LEN {
        return Err(CryptoError::Decryption(
            "Ciphertext too short (missing tag)".to_string(),
        ));
    }

    let cipher = ChaCha20Poly1305::new_from_slice(key)
        .map_err(|e| CryptoError::Decryption(format!("Invalid key: {}", e)))?;

    cipher
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|_| CryptoError::Decryption("Decryption/authentication failed".to_string()))
}

/// Right-align a label such as `PV-Msg02` in a zeroed 12-byte nonce.
pub fn nonce_from_string(s: &[u8]) -> [u8; 12] {
    let mut nonce = [0u8; 12];
    let len = s.len().min(12);
    nonce[12 - len..].copy_from_slice(&s[..len]);
    nonce
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (SessionCipher, SessionCipher) {
        let a = [0x42u8; 32];
        let b = [0x24u8; 32];
        (SessionCipher::new(a, b), SessionCipher::new(b, a))
    }

    mod session_cipher {
        use super::*;

        #[test]
        fn counters_start_at_zero() {
            let (cipher, _) = pair();
            assert_eq!(cipher.encrypt_counter(), 0);
            assert_eq!(cipher.decrypt_counter(), 0);
        }

        #[test]
        fn mirrored_peers_roundtrip_both_ways() {
            let (mut proxy, mut app) = pair();

            let sealed = proxy.encrypt(b"now playing").unwrap();
            assert_eq!(app.decrypt(&sealed).unwrap(), b"now playing");

            let sealed = app.encrypt(b"pause").unwrap();
            assert_eq!(proxy.decrypt(&sealed).unwrap(), b"pause");

            assert_eq!(proxy.encrypt_counter(), 1);
            assert_eq!(proxy.decrypt_counter(), 1);
        }

        #[test]
        fn output_is_plaintext_plus_tag() {
            let (mut cipher, _) = pair();
            let sealed = cipher.encrypt(&[0u8; 50]).unwrap();
            assert_eq!(sealed.len(), 50 + TAG_LEN);
        }

        #[test]
        fn repeated_plaintext_differs_per_counter() {
            let (mut cipher, _) = pair();
            let first = cipher.encrypt(b"same").unwrap();
            let second = cipher.encrypt(b"same").unwrap();
            assert_ne!(first, second);
        }

        #[test]
        fn counter_mismatch_fails() {
            let (mut proxy, mut app) = pair();
            let _skipped = proxy.encrypt(b"one").unwrap();
            let second = proxy.encrypt(b"two").unwrap();
            assert!(app.decrypt(&second).is_err());
            assert_eq!(app.decrypt_counter(), 0);
        }

        #[test]
        fn tampered_tag_fails() {
            let (mut proxy, mut app) = pair();
            let mut sealed = proxy.encrypt(b"secret").unwrap();
            let last = sealed.len() - 1;
            sealed[last] ^= 0xFF;
            assert!(app.decrypt(&sealed).is_err());
        }

        #[test]
        fn short_input_fails() {
            let (_, mut app) = pair();
            assert!(app.decrypt(&[0u8; 15]).is_err());
        }

        #[test]
        fn counter_nonce_matches_label_layout() {
            // Message 0 is sealed exactly like a label nonce of eight zero bytes.
            let key = [0x07u8; 32];
            let mut cipher = SessionCipher::new(key, key);
            let sealed = cipher.encrypt(b"frame").unwrap();
            let opened = decrypt_with_nonce(&key, &[0u8; 12], &sealed).unwrap();
            assert_eq!(opened, b"frame");
        }
    }

    mod nonce_construction {
        use super::*;

        #[test]
        fn counter_is_little_endian_after_four_zero_bytes() {
            let nonce = build_nonce_from_counter(0x0102030405060708);
            assert_eq!(nonce[0..4], [0, 0, 0, 0]);
            assert_eq!(nonce[4..12], 0x0102030405060708u64.to_le_bytes());
        }

        #[test]
        fn labels_are_right_aligned() {
            for label in [&b"PS-Msg06"[..], b"PV-Msg02", b"PV-Msg03"] {
                let nonce = nonce_from_string(label);
                assert_eq!(&nonce[0..4], &[0, 0, 0, 0]);
                assert_eq!(&nonce[4..12], label);
            }
        }

        #[test]
        fn full_length_label_has_no_padding() {
            assert_eq!(&nonce_from_string(b"123456789012"), b"123456789012");
        }
    }

    mod handshake_payloads {
        use super::*;

        #[test]
        fn label_roundtrip() {
            let key = [0x33u8; 32];
            let nonce = nonce_from_string(b"PV-Msg02");
            let sealed = encrypt_with_nonce(&key, &nonce, b"tlv").unwrap();
            assert_eq!(decrypt_with_nonce(&key, &nonce, &sealed).unwrap(), b"tlv");
        }

        #[test]
        fn wrong_label_fails() {
            let key = [0x33u8; 32];
            let sealed = encrypt_with_nonce(&key, &nonce_from_string(b"PV-Msg02"), b"tlv").unwrap();
            assert!(decrypt_with_nonce(&key, &nonce_from_string(b"PV-Msg03"), &sealed).is_err());
        }

        #[test]
        fn rfc8439_vector_without_aad() {
            // RFC 8439 2.8.2 key and nonce; AAD dropped, so only the
            // keystream half of the vector still applies.
            let key: [u8; 32] =
                hex::decode("808182838485868788898a8b8c8d8e8f909192939495969798999a9b9c9d9e9f")
                    .unwrap()
                    .try_into()
                    .unwrap();
            let nonce: [u8; 12] = hex::decode("070000004041424344454647")
                .unwrap()
                .try_into()
                .unwrap();
            let plaintext = b"Ladies and Gentlemen of the class of '99: If I could offer you only one tip for the future, sunscreen would be it.";

            let sealed = encrypt_with_nonce(&key, &nonce, plaintext).unwrap();
            let ciphertext = &sealed[..sealed.len() - TAG_LEN];
            assert_eq!(
                hex::encode(ciphertext),
                "d31a8d34648e60db7b86afbc53ef7ec2a4aded51296e08fea9e2b5a736ee62d63dbea45e8ca9671282fafb69da92728b1a71de0a9e060b2905d6a5b67ecd3b3692ddbd7f2d778b8c9803aee328091b58fab324e4fad675945585808b4831d7bc3ff4def08e4b7a9de576d26586cec64b6116"
            );
        }
    }
}
