//! TLV8 encoding/decoding for MRP pairing payloads.
//!
//! TLV8 format: [Type: 1 byte][Length: 1 byte][Value: 0-255 bytes]
//! Values longer than 255 bytes are fragmented across consecutive entries
//! with the same type. Entry order is kept on encode.

use mrp_core::error::DecodeError;

/// TLV types used by MRP pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TlvType {
    Method = 0x00,
    Identifier = 0x01,
    Salt = 0x02,
    PublicKey = 0x03,
    Proof = 0x04,
    EncryptedData = 0x05,
    SeqNo = 0x06,
    Error = 0x07,
    BackOff = 0x08,
    Signature = 0x0A,
}

/// Ordered TLV8 message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tlv8 {
    items: Vec<(u8, Vec<u8>)>,
}

impl Tlv8 {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TLV8 from bytes.
    ///
    /// Consecutive entries with the same type are concatenated.
    pub fn parse(data: &[u8]) -> Result<Self, DecodeError> {
        let mut items: Vec<(u8, Vec<u8>)> = Vec::new();
        let mut i = 0;

        while i < data.len() {
            if i + 2 > data.len() {
                return Err(DecodeError::Tlv("truncated header".to_string()));
            }

            let typ = data[i];
            let len = data[i + 1] as usize;
            i += 2;

            if i + len > data.len() {
                return Err(DecodeError::Tlv(format!(
                    "truncated value (expected {} bytes, got {})",
                    len,
                    data.len() - i
                )));
            }

            let value = &data[i..i + len];
            i += len;

            match items.last_mut() {
                Some((last, existing)) if *last == typ => existing.extend_from_slice(value),
                _ => items.push((typ, value.to_vec())),
            }
        }

        Ok(Self { items })
    }

    /// Encode to bytes, fragmenting values over 255 bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut result = Vec::new();

        for (typ, value) in &self.items {
            if value.is_empty() {
                result.push(*typ);
                result.push(0);
                continue;
            }
            for chunk in value.chunks(255) {
                result.push(*typ);
                result.push(chunk.len() as u8);
                result.extend_from_slice(chunk);
            }
        }

        result
    }

    /// First value stored under `typ`.
    pub fn get(&self, typ: TlvType) -> Option<&[u8]> {
        self.get_raw(typ as u8)
    }

    pub fn get_raw(&self, typ: u8) -> Option<&[u8]> {
        self.items
            .iter()
            .find(|(t, _)| *t == typ)
            .map(|(_, v)| v.as_slice())
    }

    /// Replace the value for `typ` in place, or append it.
    pub fn set(&mut self, typ: TlvType, value: impl Into<Vec<u8>>) {
        let value = value.into();
        match self.items.iter_mut().find(|(t, _)| *t == typ as u8) {
            Some((_, existing)) => *existing = value,
            None => self.items.push((typ as u8, value)),
        }
    }

    /// Builder form of [`Tlv8::set`].
    pub fn with(mut self, typ: TlvType, value: impl Into<Vec<u8>>) -> Self {
        self.set(typ, value);
        self
    }

    pub fn contains(&self, typ: TlvType) -> bool {
        self.get(typ).is_some()
    }

    /// Value of a required entry.
    pub fn require(&self, typ: TlvType) -> Result<&[u8], DecodeError> {
        self.get(typ)
            .ok_or_else(|| DecodeError::Tlv(format!("missing {:?}", typ)))
    }

    /// Sequence number (single byte).
    pub fn seq_no(&self) -> Option<u8> {
        self.get(TlvType::SeqNo).and_then(|v| v.first().copied())
    }

    /// Error code (single byte).
    pub fn error(&self) -> Option<u8> {
        self.get(TlvType::Error).and_then(|v| v.first().copied())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Step 1 pair-setup request.
    pub fn pair_setup_start() -> Self {
        Self::new()
            .with(TlvType::Method, vec![0x00])
            .with(TlvType::SeqNo, vec![0x01])
    }

    /// Step 1 pair-verify request.
    pub fn pair_verify_start(public_key: &[u8; 32]) -> Self {
        Self::new()
            .with(TlvType::SeqNo, vec![0x01])
            .with(TlvType::PublicKey, public_key.to_vec())
    }
}

impl TlvType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b {
            0x00 => Some(Self::Method),
            0x01 => Some(Self::Identifier),
            0x02 => Some(Self::Salt),
            0x03 => Some(Self::PublicKey),
            0x04 => Some(Self::Proof),
            0x05 => Some(Self::EncryptedData),
            0x06 => Some(Self::SeqNo),
            0x07 => Some(Self::Error),
            0x08 => Some(Self::BackOff),
            0x0A => Some(Self::Signature),
            _ => None,
        }
    }
}
