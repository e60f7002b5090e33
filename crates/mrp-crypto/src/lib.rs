//! # mrp-crypto
//!
//! Cryptographic building blocks for MRP pairing and session traffic.
//!
//! This crate provides:
//! - SRP-6a (3072-bit, SHA-512) in server and client roles
//! - X25519 key agreement for pair-verify
//! - Ed25519 long-term signing keys
//! - HKDF-SHA512 with the pairing and MediaRemote labels
//! - ChaCha20-Poly1305 with label and counter nonces
//! - TLV8 encoding for pairing payloads
//!
//! Secret material is zeroized on drop.

pub mod chacha;
pub mod curve25519;
pub mod ed25519;
pub mod hkdf;
pub mod keys;
pub mod srp;
pub mod tlv;

pub use chacha::SessionCipher;
pub use curve25519::EphemeralKeyPair;
pub use ed25519::LongTermKeyPair;
pub use keys::{EncryptionKey, SessionKeys, SharedSecret};
pub use srp::{ProofVerdict, SrpChallenge, SrpClient, SrpServer};
pub use tlv::{Tlv8, TlvType};
