//! Bus counters
//!
//! Each counter has exactly one writer. Counters bumped in interrupt context
//! live in [`RxCounters`] and [`TxCounters`] and use plain load/store pairs,
//! which is enough for a single writer and works on cores without
//! read-modify-write atomics. Poll-side counters are ordinary fields of the
//! bus handle.

use portable_atomic::{AtomicU32, Ordering};

/// Snapshot of all bus counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BusStats {
    /// Address bytes that matched this node
    pub frames_accepted: u32,
    /// Frames received up to their declared length
    pub frames_completed: u32,
    /// Frames consumed by the application with `packet_done`
    pub frames_retired: u32,
    /// Address bytes for other nodes
    pub foreign_addresses: u32,
    /// Headers rejected by the receive interrupt
    pub rejected_headers: u32,
    /// Overrun, framing, parity and noise errors
    pub line_errors: u32,
    /// Bytes lost to a full receive ring
    pub overflows: u32,
    /// Frames cut short by a new address byte
    pub truncated: u32,
    /// Bytes dropped by `skip_byte`
    pub bytes_skipped: u32,
    /// Bytes discarded by `recover`
    pub bytes_flushed: u32,
    /// Frames fully shifted out
    pub frames_sent: u32,
}

/// Increment a counter that has a single writer
pub(crate) fn bump(counter: &AtomicU32) {
    let value = counter.load(Ordering::Relaxed);
    counter.store(value.wrapping_add(1), Ordering::Relaxed);
}

/// Counters written by the receive interrupt
pub(crate) struct RxCounters {
    pub(crate) frames_accepted: AtomicU32,
    pub(crate) frames_completed: AtomicU32,
    pub(crate) foreign_addresses: AtomicU32,
    pub(crate) rejected_headers: AtomicU32,
    pub(crate) line_errors: AtomicU32,
    pub(crate) overflows: AtomicU32,
    pub(crate) truncated: AtomicU32,
}

impl RxCounters {
    pub(crate) const fn new() -> Self {
        Self {
            frames_accepted: AtomicU32::new(0),
            frames_completed: AtomicU32::new(0),
            foreign_addresses: AtomicU32::new(0),
            rejected_headers: AtomicU32::new(0),
            line_errors: AtomicU32::new(0),
            overflows: AtomicU32::new(0),
            truncated: AtomicU32::new(0),
        }
    }

    pub(crate) fn fill(&self, stats: &mut BusStats) {
        stats.frames_accepted = self.frames_accepted.load(Ordering::Relaxed);
        stats.frames_completed = self.frames_completed.load(Ordering::Relaxed);
        stats.foreign_addresses = self.foreign_addresses.load(Ordering::Relaxed);
        stats.rejected_headers = self.rejected_headers.load(Ordering::Relaxed);
        stats.line_errors = self.line_errors.load(Ordering::Relaxed);
        stats.overflows = self.overflows.load(Ordering::Relaxed);
        stats.truncated = self.truncated.load(Ordering::Relaxed);
    }
}

/// Counters written by the transmit interrupt
pub(crate) struct TxCounters {
    pub(crate) frames_sent: AtomicU32,
}

impl TxCounters {
    pub(crate) const fn new() -> Self {
        Self {
            frames_sent: AtomicU32::new(0),
        }
    }

    pub(crate) fn frame_sent(&self) {
        bump(&self.frames_sent);
    }

    pub(crate) fn fill(&self, stats: &mut BusStats) {
        stats.frames_sent = self.frames_sent.load(Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counters_fill_snapshot() {
        let rx = RxCounters::new();
        let tx = TxCounters::new();
        bump(&rx.frames_accepted);
        bump(&rx.frames_accepted);
        bump(&rx.overflows);
        tx.frame_sent();

        let mut stats = BusStats::default();
        rx.fill(&mut stats);
        tx.fill(&mut stats);

        assert_eq!(stats.frames_accepted, 2);
        assert_eq!(stats.overflows, 1);
        assert_eq!(stats.frames_sent, 1);
        assert_eq!(stats.truncated, 0);
    }
}
