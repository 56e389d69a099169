//! Outgoing frame queue
//!
//! Nodes only talk when the master polls them, so anything a node wants to
//! say (a key press, a temperature reading) is encoded right away and parked
//! here until the master sends `send`.

use heapless::Deque;
use hausbus_protocol::{encode_to_vec, FrameBuf, FrameError};

/// Default queue depth
pub const OUTBOX_DEPTH: usize = 8;

/// Queueing errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum OutboxError {
    /// Every slot holds an unsent frame
    Full,
    /// The frame could not be encoded
    Frame(FrameError),
}

impl From<FrameError> for OutboxError {
    fn from(e: FrameError) -> Self {
        OutboxError::Frame(e)
    }
}

/// Fixed-depth FIFO of encoded frames
pub struct Outbox<const DEPTH: usize = OUTBOX_DEPTH> {
    frames: Deque<FrameBuf, DEPTH>,
}

impl<const DEPTH: usize> Outbox<DEPTH> {
    /// Empty queue
    pub const fn new() -> Self {
        Self {
            frames: Deque::new(),
        }
    }

    /// Encode a frame and append it
    pub fn enqueue(&mut self, destination: u8, source: u8, payload: &[u8]) -> Result<(), OutboxError> {
        if self.frames.is_full() {
            return Err(OutboxError::Full);
        }
        let frame = encode_to_vec(destination, source, payload)?;
        self.frames.push_back(frame).map_err(|_| OutboxError::Full)
    }

    /// Number of queued frames, as reported in `pong`
    pub fn pending(&self) -> u8 {
        u8::try_from(self.frames.len()).unwrap_or(u8::MAX)
    }

    /// Oldest queued frame
    pub fn front(&self) -> Option<&FrameBuf> {
        self.frames.front()
    }

    /// Drop the oldest queued frame
    pub fn pop(&mut self) -> Option<FrameBuf> {
        self.frames.pop_front()
    }

    /// Drop every queued frame
    pub fn clear(&mut self) {
        self.frames.clear();
    }

    /// Whether nothing is queued
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl<const DEPTH: usize> Default for Outbox<DEPTH> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hausbus_protocol::{address::PINPAD_EVENTS_GROUP, Frame, MAX_PAYLOAD_SIZE};

    #[test]
    fn test_fifo_order() {
        let mut outbox = Outbox::<4>::new();
        outbox.enqueue(PINPAD_EVENTS_GROUP, 3, b"KEY 1").unwrap();
        outbox.enqueue(PINPAD_EVENTS_GROUP, 3, b"KEY 2").unwrap();
        assert_eq!(outbox.pending(), 2);

        let first = outbox.pop().unwrap();
        assert_eq!(Frame::parse(&first).unwrap().payload, b"KEY 1");
        let front = outbox.front().unwrap();
        assert_eq!(Frame::parse(front).unwrap().payload, b"KEY 2");
    }

    #[test]
    fn test_full_rejected() {
        let mut outbox = Outbox::<2>::new();
        outbox.enqueue(50, 3, b"a").unwrap();
        outbox.enqueue(50, 3, b"b").unwrap();
        assert_eq!(outbox.enqueue(50, 3, b"c"), Err(OutboxError::Full));
        assert_eq!(outbox.pending(), 2);
    }

    #[test]
    fn test_oversized_rejected() {
        let mut outbox = Outbox::<2>::new();
        let payload = [0u8; MAX_PAYLOAD_SIZE + 1];
        assert_eq!(
            outbox.enqueue(50, 3, &payload),
            Err(OutboxError::Frame(FrameError::PayloadTooLarge))
        );
        assert!(outbox.is_empty());
    }

    #[test]
    fn test_clear() {
        let mut outbox = Outbox::<2>::new();
        outbox.enqueue(50, 3, b"a").unwrap();
        outbox.clear();
        assert_eq!(outbox.pending(), 0);
        assert!(outbox.front().is_none());
    }
}
