//! Receive faults
//!
//! Faults are detected in the receive interrupt and handled on the next poll
//! iteration. The interrupt records each one in a small [`FaultLatch`]
//! queue: the kind plus the ring span of the frame it abandoned. The poll
//! side keeps its own count of handled faults and works through the records
//! in order.
//!
//! A fault raised while filtering abandons nothing and has an empty span.

use hausbus_hal::RxError;
use portable_atomic::{fence, AtomicU32, AtomicU8, AtomicUsize, Ordering};

/// Fault records kept for the poll side
pub(crate) const FAULT_SLOTS: usize = 4;

/// Why the receive path abandoned a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    /// The UART flagged an overrun, framing, parity or noise error
    Line(RxError),
    /// The receive ring was full
    Overflow,
    /// An address byte arrived before the previous frame was complete
    Truncated,
}

impl FaultKind {
    fn to_raw(self) -> u8 {
        match self {
            FaultKind::Line(RxError::Overrun) => 0,
            FaultKind::Line(RxError::Framing) => 1,
            FaultKind::Line(RxError::Parity) => 2,
            FaultKind::Line(RxError::Noise) => 3,
            FaultKind::Overflow => 4,
            FaultKind::Truncated => 5,
        }
    }

    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => FaultKind::Line(RxError::Overrun),
            1 => FaultKind::Line(RxError::Framing),
            2 => FaultKind::Line(RxError::Parity),
            3 => FaultKind::Line(RxError::Noise),
            4 => FaultKind::Overflow,
            _ => FaultKind::Truncated,
        }
    }
}

/// A fault as seen by the poll side
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Fault {
    /// What went wrong
    pub kind: FaultKind,
    /// Ring write position where the abandoned frame starts
    pub start: usize,
    /// Ring write position when the fault was raised
    pub end: usize,
    /// Sequence number; handling this fault means handling all up to it
    pub sequence: u32,
    /// Older records overwritten before the poll side saw them
    ///
    /// Their spans are unknown, so nothing before `end` can be trusted.
    pub missed: u32,
}

struct FaultSlot {
    kind: AtomicU8,
    start: AtomicUsize,
    end: AtomicUsize,
}

impl FaultSlot {
    const fn new() -> Self {
        Self {
            kind: AtomicU8::new(0),
            start: AtomicUsize::new(0),
            end: AtomicUsize::new(0),
        }
    }
}

/// Interrupt-to-poll fault hand-over
pub(crate) struct FaultLatch {
    raised: AtomicU32,
    slots: [FaultSlot; FAULT_SLOTS],
}

impl FaultLatch {
    pub(crate) const fn new() -> Self {
        Self {
            raised: AtomicU32::new(0),
            slots: [const { FaultSlot::new() }; FAULT_SLOTS],
        }
    }

    fn slot(&self, sequence: u32) -> &FaultSlot {
        &self.slots[sequence as usize % FAULT_SLOTS]
    }

    /// Record a fault abandoning the span `start..end` (receive interrupt only)
    pub(crate) fn raise(&self, kind: FaultKind, start: usize, end: usize) {
        let sequence = self.raised.load(Ordering::Relaxed).wrapping_add(1);
        let slot = self.slot(sequence);
        slot.kind.store(kind.to_raw(), Ordering::Relaxed);
        slot.start.store(start, Ordering::Relaxed);
        slot.end.store(end, Ordering::Relaxed);
        // Release publishes the record together with the new count
        self.raised.store(sequence, Ordering::Release);
    }

    /// Oldest fault raised beyond `handled`
    ///
    /// If the interrupt wrapped the record queue, the latest record is
    /// returned with `missed` set.
    pub(crate) fn pending(&self, handled: u32) -> Option<Fault> {
        loop {
            let raised = self.raised.load(Ordering::Acquire);
            let behind = raised.wrapping_sub(handled);
            if behind == 0 {
                return None;
            }

            let (sequence, missed) = if behind as usize > FAULT_SLOTS {
                (raised, behind - 1)
            } else {
                (handled.wrapping_add(1), 0)
            };
            let slot = self.slot(sequence);
            let fault = Fault {
                kind: FaultKind::from_raw(slot.kind.load(Ordering::Relaxed)),
                start: slot.start.load(Ordering::Relaxed),
                end: slot.end.load(Ordering::Relaxed),
                sequence,
                missed,
            };

            // A raise between the loads may have rewritten the slot
            fence(Ordering::Acquire);
            if self.raised.load(Ordering::Relaxed) == raised {
                return Some(fault);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_roundtrip() {
        let kinds = [
            FaultKind::Line(RxError::Overrun),
            FaultKind::Line(RxError::Framing),
            FaultKind::Line(RxError::Parity),
            FaultKind::Line(RxError::Noise),
            FaultKind::Overflow,
            FaultKind::Truncated,
        ];
        for kind in kinds {
            assert_eq!(FaultKind::from_raw(kind.to_raw()), kind);
        }
    }

    #[test]
    fn test_latch_pending_until_handled() {
        let latch = FaultLatch::new();
        assert_eq!(latch.pending(0), None);

        latch.raise(FaultKind::Overflow, 4, 12);
        let fault = latch.pending(0).unwrap();
        assert_eq!(fault.kind, FaultKind::Overflow);
        assert_eq!((fault.start, fault.end), (4, 12));
        assert_eq!(fault.sequence, 1);
        assert_eq!(fault.missed, 0);
        assert_eq!(latch.pending(fault.sequence), None);
    }

    #[test]
    fn test_faults_handed_over_in_order() {
        let latch = FaultLatch::new();
        latch.raise(FaultKind::Truncated, 0, 8);
        latch.raise(FaultKind::Line(RxError::Noise), 20, 20);

        let first = latch.pending(0).unwrap();
        assert_eq!(first.kind, FaultKind::Truncated);
        assert_eq!((first.start, first.end), (0, 8));

        let second = latch.pending(first.sequence).unwrap();
        assert_eq!(second.kind, FaultKind::Line(RxError::Noise));
        assert_eq!((second.start, second.end), (20, 20));
        assert_eq!(latch.pending(second.sequence), None);
    }

    #[test]
    fn test_wrapped_queue_reports_latest_with_missed() {
        let latch = FaultLatch::new();
        for i in 0..(FAULT_SLOTS + 2) {
            latch.raise(FaultKind::Overflow, i * 10, i * 10 + 5);
        }

        let fault = latch.pending(0).unwrap();
        assert_eq!(fault.sequence as usize, FAULT_SLOTS + 2);
        assert_eq!(fault.missed as usize, FAULT_SLOTS + 1);
        assert_eq!(fault.end, (FAULT_SLOTS + 1) * 10 + 5);
        assert_eq!(latch.pending(fault.sequence), None);
    }

    #[test]
    fn test_sequence_counter_wraps() {
        let latch = FaultLatch::new();
        latch.raised.store(u32::MAX, Ordering::Relaxed);
        latch.raise(FaultKind::Truncated, 1, 2);

        let fault = latch.pending(u32::MAX).unwrap();
        assert_eq!(fault.sequence, 0);
        assert_eq!(fault.kind, FaultKind::Truncated);
    }
}
