//! Frame codec: `[varint length][payload]`, payload sealed once a leg is encrypted.

use crate::session::LegSession;
use crate::varint;
use mrp_core::error::{FramingError, Result};
use mrp_core::ProtocolMessage;
use prost::Message;

/// One complete inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    /// Plaintext payload exactly as received.
    pub raw: Vec<u8>,
    pub message: ProtocolMessage,
}

/// Serialize and frame `message` for this leg.
pub fn encode(session: &mut LegSession, message: &ProtocolMessage) -> Result<Vec<u8>> {
    encode_raw(session, &message.encode_to_vec())
}

/// Frame an already serialized payload for this leg.
pub fn encode_raw(session: &mut LegSession, payload: &[u8]) -> Result<Vec<u8>> {
    let body = match session.cipher.as_mut() {
        Some(cipher) => cipher.encrypt(payload)?,
        None => payload.to_vec(),
    };

    let mut out = Vec::with_capacity(body.len() + varint::MAX_VARINT_LEN);
    varint::encode_length(body.len(), &mut out);
    out.extend_from_slice(&body);
    Ok(out)
}

/// Take the next complete payload out of the leg buffer, if there is one.
pub fn next_payload(session: &mut LegSession) -> std::result::Result<Option<Vec<u8>>, FramingError> {
    let (len, header) = match varint::decode_length(&session.buffer)? {
        Some(prefix) => prefix,
        None => return Ok(None),
    };

    let len = usize::try_from(len).unwrap_or(usize::MAX);
    if len > session.max_frame_len {
        return Err(FramingError::FrameTooLarge {
            len,
            max: session.max_frame_len,
        });
    }
    if session.buffer.len() - header < len {
        return Ok(None);
    }

    let body: Vec<u8> = session.buffer.drain(..header + len).skip(header).collect();
    match session.cipher.as_mut() {
        Some(cipher) => cipher.decrypt(&body).map(Some).map_err(FramingError::Decrypt),
        None => Ok(Some(body)),
    }
}

/// Take and parse the next complete frame.
pub fn next_frame(session: &mut LegSession) -> Result<Option<Frame>> {
    match next_payload(session)? {
        Some(raw) => {
            let message = ProtocolMessage::decode(raw.as_slice())
                .map_err(mrp_core::DecodeError::from)?;
            Ok(Some(Frame { raw, message }))
        }
        None => Ok(None),
    }
}

/// Feed `bytes` and return every payload completed by them.
pub fn decode_payloads(
    session: &mut LegSession,
    bytes: &[u8],
) -> std::result::Result<Vec<Vec<u8>>, FramingError> {
    session.extend(bytes);
    let mut payloads = Vec::new();
    while let Some(payload) = next_payload(session)? {
        payloads.push(payload);
    }
    Ok(payloads)
}

/// Feed `bytes` and return every frame completed by them.
pub fn decode(session: &mut LegSession, bytes: &[u8]) -> Result<Vec<Frame>> {
    session.extend(bytes);
    let mut frames = Vec::new();
    while let Some(frame) = next_frame(session)? {
        frames.push(frame);
    }
    Ok(frames)
}
