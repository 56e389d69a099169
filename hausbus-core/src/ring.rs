//! Lock-free single-producer/single-consumer receive ring
//!
//! The receive interrupt is the only writer of the write cursor and of the
//! slots between the write cursor and the read cursor (the free region). The
//! poll loop is the only writer of the read cursor; it only ever reads the
//! slots between the read cursor and the write cursor (the filled region).
//! [`RingBuffer::split`] hands out one [`Producer`] and one [`Consumer`] so
//! the two sides cannot alias.
//!
//! Cursors are free-running counters; a slot index is `cursor & (N - 1)`,
//! which is why the capacity must be a power of two. Because the counters
//! never wrap at `N`, all `N` slots are usable and a full ring is
//! distinguishable from an empty one.

use portable_atomic::{AtomicU8, AtomicUsize, Ordering};

/// The ring had no free slot for the byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Overflow;

/// Fixed-capacity byte ring shared between the receive interrupt and the poll loop
pub struct RingBuffer<const N: usize> {
    slots: [AtomicU8; N],
    write: AtomicUsize,
    read: AtomicUsize,
}

impl<const N: usize> RingBuffer<N> {
    const MASK: usize = {
        assert!(N.is_power_of_two(), "ring capacity must be a power of two");
        N - 1
    };

    /// Create an empty ring
    pub const fn new() -> Self {
        Self {
            slots: [const { AtomicU8::new(0) }; N],
            write: AtomicUsize::new(0),
            read: AtomicUsize::new(0),
        }
    }

    /// Number of slots
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Split into the interrupt-side producer and the poll-side consumer
    pub fn split(&mut self) -> (Producer<'_, N>, Consumer<'_, N>) {
        let ring: &Self = self;
        (Producer { ring }, Consumer { ring })
    }

    fn slot(&self, cursor: usize) -> &AtomicU8 {
        &self.slots[cursor & Self::MASK]
    }
}

impl<const N: usize> Default for RingBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Write side, owned by the receive interrupt
pub struct Producer<'a, const N: usize> {
    ring: &'a RingBuffer<N>,
}

impl<const N: usize> Producer<'_, N> {
    /// Append one byte
    ///
    /// A full ring reports [`Overflow`]; the byte is dropped and the buffered
    /// bytes stay untouched.
    pub fn push(&mut self, byte: u8) -> Result<(), Overflow> {
        let write = self.ring.write.load(Ordering::Relaxed);
        // Acquire pairs with the consumer's release so a freed slot is no
        // longer being read when it gets overwritten
        let read = self.ring.read.load(Ordering::Acquire);
        if write.wrapping_sub(read) >= N {
            return Err(Overflow);
        }

        self.ring.slot(write).store(byte, Ordering::Relaxed);
        self.ring.write.store(write.wrapping_add(1), Ordering::Release);
        Ok(())
    }

    /// Bytes currently buffered
    pub fn occupancy(&self) -> usize {
        let read = self.ring.read.load(Ordering::Acquire);
        self.ring.write.load(Ordering::Relaxed).wrapping_sub(read)
    }

    /// Whether the next push would overflow
    pub fn is_full(&self) -> bool {
        self.occupancy() >= N
    }

    /// Free-running write cursor
    ///
    /// Positions can be handed to the consumer's
    /// [`Consumer::advance_to`] to discard everything written so far.
    pub fn position(&self) -> usize {
        self.ring.write.load(Ordering::Relaxed)
    }
}

/// Read side, owned by the poll loop
pub struct Consumer<'a, const N: usize> {
    ring: &'a RingBuffer<N>,
}

impl<const N: usize> Consumer<'_, N> {
    /// Bytes currently buffered
    pub fn occupancy(&self) -> usize {
        // Acquire pairs with the producer's release so the slots below the
        // write cursor are visible
        let write = self.ring.write.load(Ordering::Acquire);
        write.wrapping_sub(self.ring.read.load(Ordering::Relaxed))
    }

    /// Whether nothing is buffered
    pub fn is_empty(&self) -> bool {
        self.occupancy() == 0
    }

    /// Byte at `offset` from the read cursor, if buffered
    pub fn peek(&self, offset: usize) -> Option<u8> {
        if offset >= self.occupancy() {
            return None;
        }
        let read = self.ring.read.load(Ordering::Relaxed);
        Some(self.ring.slot(read.wrapping_add(offset)).load(Ordering::Relaxed))
    }

    /// Copy buffered bytes starting at `offset` into `dst` without consuming them
    ///
    /// Handles wraparound. Returns the number of bytes copied, which is
    /// smaller than `dst.len()` when fewer bytes are buffered.
    pub fn peek_window(&self, offset: usize, dst: &mut [u8]) -> usize {
        let available = self.occupancy().saturating_sub(offset);
        let len = dst.len().min(available);
        let start = self.ring.read.load(Ordering::Relaxed).wrapping_add(offset);

        for (i, byte) in dst[..len].iter_mut().enumerate() {
            *byte = self.ring.slot(start.wrapping_add(i)).load(Ordering::Relaxed);
        }
        len
    }

    /// Retire up to `n` bytes
    ///
    /// Never moves past the write cursor. Returns the number of bytes
    /// actually retired.
    pub fn advance_read(&mut self, n: usize) -> usize {
        let n = n.min(self.occupancy());
        let read = self.ring.read.load(Ordering::Relaxed);
        self.ring.read.store(read.wrapping_add(n), Ordering::Release);
        n
    }

    /// Retire everything up to a producer position
    ///
    /// Positions already behind the read cursor are ignored. Returns the
    /// number of bytes retired.
    pub fn advance_to(&mut self, position: usize) -> usize {
        let read = self.ring.read.load(Ordering::Relaxed);
        let distance = position.wrapping_sub(read);
        if distance > self.occupancy() {
            return 0;
        }
        self.advance_read(distance)
    }

    /// Free-running read cursor
    pub fn position(&self) -> usize {
        self.ring.read.load(Ordering::Relaxed)
    }
}
