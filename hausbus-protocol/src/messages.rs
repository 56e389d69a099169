//! Master polling messages
//!
//! Nodes never talk on their own. The master walks the node addresses with
//! `ping`; each node answers `pong` plus the number of frames waiting in its
//! outgoing queue. If that count is non-zero the master asks for one frame
//! with `send`, and the node transmits the oldest queued frame verbatim.
//!
//! ```text
//! master → node   "ping"
//! node   → master "pong" <pending:u8>
//! master → node   "send"
//! node   → group  <queued frame>
//! ```

use heapless::Vec;

use crate::frame::{encode_to_vec, Frame, FrameBuf, FrameError};

const PING: &[u8] = b"ping";
const PONG: &[u8] = b"pong";
const SEND: &[u8] = b"send";

/// Largest encoded poll payload
pub const MAX_POLL_PAYLOAD: usize = 5;

/// Messages of the polling exchange
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PollMessage {
    /// Liveness probe from the master
    Ping,
    /// Answer to a ping with the number of queued frames
    Pong { pending: u8 },
    /// Request for the oldest queued frame
    Send,
}

impl PollMessage {
    /// Recognise a poll message at the start of a payload
    ///
    /// Extra trailing bytes are tolerated, as older masters pad their
    /// requests.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        if payload.starts_with(PING) {
            Some(PollMessage::Ping)
        } else if payload.starts_with(SEND) {
            Some(PollMessage::Send)
        } else if payload.starts_with(PONG) {
            let pending = *payload.get(PONG.len())?;
            Some(PollMessage::Pong { pending })
        } else {
            None
        }
    }

    /// Recognise a poll message carried by a frame
    pub fn from_frame(frame: &Frame<'_>) -> Option<Self> {
        Self::from_payload(frame.payload)
    }

    /// Payload bytes of this message
    pub fn to_payload(&self) -> Vec<u8, MAX_POLL_PAYLOAD> {
        let keyword = match self {
            PollMessage::Ping => PING,
            PollMessage::Send => SEND,
            PollMessage::Pong { .. } => PONG,
        };

        // Every variant fits MAX_POLL_PAYLOAD
        let mut payload = Vec::new();
        let _ = payload.extend_from_slice(keyword);
        if let PollMessage::Pong { pending } = self {
            let _ = payload.push(*pending);
        }
        payload
    }

    /// Encode this message as a complete frame
    pub fn to_frame(&self, destination: u8, source: u8) -> Result<FrameBuf, FrameError> {
        encode_to_vec(destination, source, &self.to_payload())
    }
}
