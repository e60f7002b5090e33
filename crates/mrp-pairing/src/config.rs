//! Pairing parameters and injectable key seeds.

use std::fmt;

/// PIN the app is told to enter.
pub const DEFAULT_PIN: &str = "1111";

/// Long-term signing seed used when none is configured.
pub const DEFAULT_SIGNING_SEED: [u8; 32] = [0x01; 32];

/// Settings for the app-facing handshakes.
///
/// Seeds left as `None` are drawn fresh for each handshake attempt.
#[derive(Clone)]
pub struct PairingConfig {
    pub pin: String,
    pub signing_seed: [u8; 32],
    pub verify_seed: Option<[u8; 32]>,
    pub srp_private: Option<Vec<u8>>,
    pub salt: Option<[u8; 16]>,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            pin: DEFAULT_PIN.to_string(),
            signing_seed: DEFAULT_SIGNING_SEED,
            verify_seed: None,
            srp_private: None,
            salt: None,
        }
    }
}

impl PairingConfig {
    pub fn with_pin(mut self, pin: impl Into<String>) -> Self {
        self.pin = pin.into();
        self
    }

    pub fn with_signing_seed(mut self, seed: [u8; 32]) -> Self {
        self.signing_seed = seed;
        self
    }

    /// Fix the X25519 secret used for pair-verify.
    pub fn with_verify_seed(mut self, seed: [u8; 32]) -> Self {
        self.verify_seed = Some(seed);
        self
    }

    /// Fix the SRP server private value `b`.
    pub fn with_srp_private(mut self, private: impl Into<Vec<u8>>) -> Self {
        self.srp_private = Some(private.into());
        self
    }

    pub fn with_salt(mut self, salt: [u8; 16]) -> Self {
        self.salt = Some(salt);
        self
    }
}

impl fmt::Debug for PairingConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PairingConfig")
            .field("pin", &self.pin)
            .field("verify_seed", &self.verify_seed.map(|_| "<fixed>"))
            .field("srp_private", &self.srp_private.as_ref().map(|_| "<fixed>"))
            .field("salt", &self.salt.map(hex::encode))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = PairingConfig::default();
        assert_eq!(config.pin, "1111");
        assert_eq!(config.signing_seed, [0x01; 32]);
        assert!(config.verify_seed.is_none());
        assert!(config.srp_private.is_none());
        assert!(config.salt.is_none());
    }

    #[test]
    fn builder_sets_fields() {
        let config = PairingConfig::default()
            .with_pin("4321")
            .with_signing_seed([0x02; 32])
            .with_verify_seed([0x03; 32])
            .with_srp_private(vec![0x04; 32])
            .with_salt([0x05; 16]);

        assert_eq!(config.pin, "4321");
        assert_eq!(config.signing_seed, [0x02; 32]);
        assert_eq!(config.verify_seed, Some([0x03; 32]));
        assert_eq!(config.srp_private.as_deref(), Some(&[0x04u8; 32][..]));
        assert_eq!(config.salt, Some([0x05; 16]));
    }

    #[test]
    fn debug_hides_seeds() {
        let config = PairingConfig::default().with_verify_seed([0xEE; 32]);
        let printed = format!("{:?}", config);
        assert!(printed.contains("1111"));
        assert!(!printed.contains("238"));
        assert!(!printed.contains("eeee"));
    }
}
