//! Stored pairing with the genuine device.
//!
//! The string form is `ltpk:ltsk:atv_id:client_id`, each field hex encoded,
//! as written by an earlier pair-setup against the device.

use mrp_core::error::ConfigError;
use std::fmt;
use std::str::FromStr;

/// Keys and identifiers from a completed pair-setup.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    /// Device long-term public key.
    pub ltpk: [u8; 32],
    /// Our long-term signing seed.
    pub ltsk: [u8; 32],
    /// Device identifier.
    pub atv_id: Vec<u8>,
    /// Our identifier as registered with the device.
    pub client_id: Vec<u8>,
}

fn key_field(name: &str, field: &str) -> Result<[u8; 32], ConfigError> {
    let bytes = hex::decode(field)
        .map_err(|e| ConfigError::InvalidCredentials(format!("{}: {}", name, e)))?;
    bytes.try_into().map_err(|b: Vec<u8>| {
        ConfigError::InvalidCredentials(format!("{}: expected 32 bytes, got {}", name, b.len()))
    })
}

fn id_field(name: &str, field: &str) -> Result<Vec<u8>, ConfigError> {
    let bytes = hex::decode(field)
        .map_err(|e| ConfigError::InvalidCredentials(format!("{}: {}", name, e)))?;
    if bytes.is_empty() {
        return Err(ConfigError::InvalidCredentials(format!("{}: empty", name)));
    }
    Ok(bytes)
}

impl FromStr for Credentials {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let fields: Vec<&str> = s.trim().split(':').collect();
        if fields.len() != 4 {
            return Err(ConfigError::InvalidCredentials(format!(
                "expected 4 fields, got {}",
                fields.len()
            )));
        }

        Ok(Self {
            ltpk: key_field("ltpk", fields[0])?,
            ltsk: key_field("ltsk", fields[1])?,
            atv_id: id_field("atv_id", fields[2])?,
            client_id: id_field("client_id", fields[3])?,
        })
    }
}

impl fmt::Display for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}:{}:{}",
            hex::encode(self.ltpk),
            hex::encode(self.ltsk),
            hex::encode(&self.atv_id),
            hex::encode(&self.client_id)
        )
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("ltpk", &hex::encode(self.ltpk))
            .field("atv_id", &String::from_utf8_lossy(&self.atv_id))
            .field("client_id", &String::from_utf8_lossy(&self.client_id))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> String {
        format!(
            "{}:{}:{}:{}",
            "aa".repeat(32),
            "bb".repeat(32),
            hex::encode("atv-1"),
            hex::encode("client-1")
        )
    }

    #[test]
    fn parses_four_hex_fields() {
        let creds: Credentials = sample().parse().unwrap();
        assert_eq!(creds.ltpk, [0xAA; 32]);
        assert_eq!(creds.ltsk, [0xBB; 32]);
        assert_eq!(creds.atv_id, b"atv-1");
        assert_eq!(creds.client_id, b"client-1");
    }

    #[test]
    fn display_restores_input() {
        let creds: Credentials = sample().parse().unwrap();
        assert_eq!(creds.to_string(), sample());
    }

    #[test]
    fn rejects_wrong_field_count() {
        let err = "aa:bb:cc".parse::<Credentials>().unwrap_err();
        assert!(err.to_string().contains("expected 4 fields"));
    }

    #[test]
    fn rejects_short_key() {
        let input = format!("aabb:{}:00:00", "bb".repeat(32));
        let err = input.parse::<Credentials>().unwrap_err();
        assert!(err.to_string().contains("ltpk"));
    }

    #[test]
    fn rejects_non_hex() {
        let input = format!("{}:{}:zz:00", "aa".repeat(32), "bb".repeat(32));
        assert!(matches!(
            input.parse::<Credentials>(),
            Err(ConfigError::InvalidCredentials(_))
        ));
    }

    #[test]
    fn debug_omits_signing_seed() {
        let creds: Credentials = sample().parse().unwrap();
        assert!(!format!("{:?}", creds).contains(&"bb".repeat(32)));
    }
}
