//! Identity the proxy pairs with as an accessory.

use crate::config::PairingConfig;
use mrp_core::DeviceIdentity;
use mrp_crypto::ed25519::LongTermKeyPair;

/// Device identifier and long-term signing key shared by every app connection.
#[derive(Clone)]
pub struct AccessoryIdentity {
    device_id: DeviceIdentity,
    keypair: LongTermKeyPair,
}

impl AccessoryIdentity {
    pub fn new(device_id: DeviceIdentity, keypair: LongTermKeyPair) -> Self {
        Self { device_id, keypair }
    }

    /// Identity whose signing key comes from the configured seed.
    pub fn from_config(device_id: DeviceIdentity, config: &PairingConfig) -> Self {
        Self::new(device_id, LongTermKeyPair::from_seed(&config.signing_seed))
    }

    pub fn device_id(&self) -> &DeviceIdentity {
        &self.device_id
    }

    /// LTPK handed to the app in pair-setup step 6.
    pub fn ltpk(&self) -> [u8; 32] {
        self.keypair.public_key()
    }

    /// Sign `prefix || device id || suffix`.
    pub fn sign_with_id(&self, prefix: &[u8], suffix: &[u8]) -> [u8; 64] {
        let id = self.device_id.as_bytes();
        let mut info = Vec::with_capacity(prefix.len() + id.len() + suffix.len());
        info.extend_from_slice(prefix);
        info.extend_from_slice(id);
        info.extend_from_slice(suffix);
        self.keypair.sign(&info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mrp_crypto::ed25519::verify;

    #[test]
    fn from_config_uses_signing_seed() {
        let config = PairingConfig::default();
        let identity = AccessoryIdentity::from_config(DeviceIdentity::new("dev"), &config);
        assert_eq!(
            identity.ltpk(),
            LongTermKeyPair::from_seed(&[0x01; 32]).public_key()
        );
    }

    #[test]
    fn signature_covers_identifier() {
        let identity =
            AccessoryIdentity::from_config(DeviceIdentity::new("dev"), &PairingConfig::default());
        let sig = identity.sign_with_id(b"pre", b"post");

        assert!(verify(&identity.ltpk(), b"predevpost", &sig).is_ok());
        assert!(verify(&identity.ltpk(), b"preotherpost", &sig).is_err());
    }
}
