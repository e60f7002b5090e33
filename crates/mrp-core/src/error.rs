//! Error types for the MRP proxy.

use thiserror::Error;

/// Primary error type for all proxy operations.
///
/// Everything except [`Error::Config`] and a failed upstream start is scoped
/// to a single connection: the task that owns the connection logs it and
/// drops that connection only.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("Authentication failed: {0}")]
    Authentication(#[from] AuthFailure),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Decode error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Upstream device connection closed")]
    UpstreamClosed,
}

/// Errors while segmenting or unsealing wire frames.
#[derive(Error, Debug)]
pub enum FramingError {
    #[error("Malformed varint length prefix")]
    MalformedLength,

    #[error("Frame of {len} bytes exceeds limit of {max} bytes")]
    FrameTooLarge { len: usize, max: usize },

    #[error("Frame decryption failed: {0}")]
    Decrypt(CryptoError),
}

/// A peer failed to prove what it claimed during a handshake.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthFailure {
    #[error("SRP proof mismatch")]
    ProofMismatch,

    #[error("Signature verification failed")]
    SignatureInvalid,

    #[error("Could not decrypt {0} payload")]
    DecryptFailed(&'static str),

    #[error("Peer identifier does not match stored credentials")]
    IdentifierMismatch,

    #[error("Peer reported pairing error 0x{0:02x}")]
    PeerRejected(u8),
}

/// Handshake messages that arrive in the wrong shape or order.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Unknown handshake step {0}")]
    UnknownStep(u8),

    #[error("Handshake step out of order: expected {expected}, got {actual}")]
    OutOfOrder { expected: u8, actual: u8 },

    #[error("Missing required TLV type: {0}")]
    MissingTlv(u8),

    #[error("Pairing data has no sequence number")]
    MissingSeqNo,

    #[error("Unexpected message: {0}")]
    UnexpectedMessage(String),
}

/// Cryptographic operation errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("Signature verification failed")]
    SignatureInvalid,
}

/// Parse failures for protobuf payloads and TLV8 blobs.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("Invalid protobuf payload: {0}")]
    Protobuf(#[from] prost::DecodeError),

    #[error("Invalid TLV8 data: {0}")]
    Tlv(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid value: {0}")]
    InvalidValue(String),
}

/// Errors while publishing the discovery record.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("mDNS daemon error: {0}")]
    Daemon(String),

    #[error("Service registration failed: {0}")]
    Registration(String),
}

/// Bad command line or credentials.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Expected {expected} arguments, got {actual}")]
    ArgumentCount { expected: usize, actual: usize },

    #[error("Invalid argument {name}: {reason}")]
    InvalidArgument { name: &'static str, reason: String },

    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
}

/// Convenience Result type.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// True when the error should end the whole process rather than one connection.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Config(_) | Error::UpstreamClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_formats() {
        let auth_err = Error::Authentication(AuthFailure::ProofMismatch);
        assert!(auth_err.to_string().contains("Authentication failed"));
        assert!(auth_err.to_string().contains("SRP proof mismatch"));

        let step_err = Error::Protocol(ProtocolError::OutOfOrder {
            expected: 1,
            actual: 3,
        });
        assert!(step_err.to_string().contains("expected 1, got 3"));

        let frame_err = Error::Framing(FramingError::FrameTooLarge { len: 10, max: 4 });
        assert!(frame_err.to_string().contains("exceeds limit of 4"));

        let closed = Error::UpstreamClosed;
        assert!(closed.to_string().contains("closed"));

        let decrypt = AuthFailure::DecryptFailed("PV-Msg03");
        assert!(decrypt.to_string().contains("PV-Msg03"));
    }

    #[test]
    fn error_source_chain() {
        use std::error::Error as StdError;

        let io_err = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "test");
        let conn_err = Error::Connection(io_err);
        assert!(conn_err.source().is_some());

        let err = Error::Decode(DecodeError::MissingField("pairingData"));
        assert!(err.source().is_some());
    }

    #[test]
    fn error_conversions() {
        let err: Error = FramingError::MalformedLength.into();
        assert!(matches!(err, Error::Framing(_)));

        let err: Error = AuthFailure::SignatureInvalid.into();
        assert!(matches!(err, Error::Authentication(_)));

        let err: Error = ProtocolError::UnknownStep(7).into();
        assert!(matches!(err, Error::Protocol(_)));

        let err: Error = CryptoError::SignatureInvalid.into();
        assert!(matches!(err, Error::Crypto(_)));

        let err: Error = DecodeError::Tlv("truncated".to_string()).into();
        assert!(matches!(err, Error::Decode(_)));

        let err: Error = ConfigError::InvalidCredentials("short".to_string()).into();
        assert!(matches!(err, Error::Config(_)));

        let err: Error = DiscoveryError::Daemon("down".to_string()).into();
        assert!(matches!(err, Error::Discovery(_)));

        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Connection(_)));
    }

    #[test]
    fn only_config_and_upstream_loss_are_fatal() {
        assert!(Error::UpstreamClosed.is_fatal());
        assert!(Error::Config(ConfigError::ArgumentCount {
            expected: 5,
            actual: 2
        })
        .is_fatal());
        assert!(!Error::Authentication(AuthFailure::ProofMismatch).is_fatal());
        assert!(!Error::Framing(FramingError::MalformedLength).is_fatal());
    }
}
