//! Frame boundary detection
//!
//! The detector looks at the bytes between the read cursor and a limit
//! (the write cursor, or the start of a frame abandoned by a fault) and
//! decides whether they start with a complete, valid frame. It never
//! consumes bytes; retiring a frame or skipping a bad byte is an explicit
//! operation of the bus handle.

use hausbus_protocol::{validate_header, Header, HEADER_SIZE, MAX_FRAME_SIZE};

use crate::ring::Consumer;

/// Receive-side state reported to the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusStatus {
    /// Nothing to do, or a frame is still arriving
    Idle,
    /// A whole frame with a valid header is buffered at the read cursor
    CompleteFrame,
    /// The bytes at the read cursor are not a valid header; call `skip_byte`
    HeaderChecksumMismatch,
    /// The receive interrupt dropped data; call `recover`
    Faulted,
}

/// Result of inspecting the buffered bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Detection {
    Idle,
    Complete(Header),
    Mismatch,
}

impl Detection {
    pub(crate) fn status(self) -> BusStatus {
        match self {
            Detection::Idle => BusStatus::Idle,
            Detection::Complete(_) => BusStatus::CompleteFrame,
            Detection::Mismatch => BusStatus::HeaderChecksumMismatch,
        }
    }
}

/// Largest frame that can ever be fully buffered in a ring of `N` bytes
pub(crate) const fn frame_limit(capacity: usize) -> usize {
    if capacity < MAX_FRAME_SIZE {
        capacity
    } else {
        MAX_FRAME_SIZE
    }
}

/// Whether a header announces a frame the receiver can take
pub(crate) fn header_fits(header: &Header, capacity: usize) -> bool {
    header.frame_len() <= frame_limit(capacity)
}

/// Inspect the first `available` buffered bytes
pub(crate) fn detect<const N: usize>(rx: &Consumer<'_, N>, available: usize) -> Detection {
    let buffered = available.min(rx.occupancy());
    if buffered < HEADER_SIZE {
        return Detection::Idle;
    }

    let mut window = [0u8; HEADER_SIZE];
    rx.peek_window(0, &mut window);

    match validate_header(&window) {
        Ok(header) if !header_fits(&header, N) => Detection::Mismatch,
        Ok(header) if buffered >= header.frame_len() => Detection::Complete(header),
        Ok(_) => Detection::Idle,
        Err(_) => Detection::Mismatch,
    }
}
