//! Per-connection codec state.

use mrp_crypto::{keys::SessionKeys, SessionCipher};
use tracing::debug;

/// Largest frame accepted by default.
pub const DEFAULT_MAX_FRAME_LEN: usize = 1 << 20;

/// State of one leg: cipher, paired flag and the unread tail of the stream.
///
/// The cipher and the paired flag only ever get switched on.
pub struct LegSession {
    pub(crate) cipher: Option<SessionCipher>,
    paired: bool,
    pub(crate) buffer: Vec<u8>,
    pub(crate) max_frame_len: usize,
}

impl Default for LegSession {
    fn default() -> Self {
        Self::new()
    }
}

impl LegSession {
    pub fn new() -> Self {
        Self::with_max_frame_len(DEFAULT_MAX_FRAME_LEN)
    }

    pub fn with_max_frame_len(max_frame_len: usize) -> Self {
        Self {
            cipher: None,
            paired: false,
            buffer: Vec::new(),
            max_frame_len,
        }
    }

    pub fn is_paired(&self) -> bool {
        self.paired
    }

    pub fn mark_paired(&mut self) {
        if !self.paired {
            debug!("leg paired");
        }
        self.paired = true;
    }

    pub fn is_encrypted(&self) -> bool {
        self.cipher.is_some()
    }

    /// Encrypt every frame from now on. Also marks the leg paired.
    pub fn activate(&mut self, keys: &SessionKeys) {
        self.cipher = Some(SessionCipher::from_keys(keys));
        self.mark_paired();
        debug!("leg encryption enabled");
    }

    /// Append bytes read from the socket.
    pub fn extend(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes held back waiting for the rest of a frame.
    pub fn buffered_len(&self) -> usize {
        self.buffer.len()
    }
}
