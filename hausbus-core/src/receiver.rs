//! Receive interrupt side
//!
//! The [`Receiver`] runs inside the UART receive interrupt. It decides which
//! address bytes belong to this node, switches the UART between address
//! filtering and full reception, and appends accepted bytes to the ring.
//!
//! ```text
//!            address byte, accepted
//!  Filtering ───────────────────────▶ Receiving
//!      ▲                                  │
//!      └──────────────────────────────────┘
//!   frame complete, header rejected or fault
//! ```
//!
//! Filtering is re-armed exactly once per frame. Nothing here blocks or
//! logs; problems are handed to the poll side through the fault latch.

use hausbus_hal::{MultidropRx, RxEvent};
use hausbus_protocol::{validate_header, HEADER_SIZE};

use crate::config::NodeConfig;
use crate::detector::header_fits;
use crate::fault::{FaultKind, FaultLatch};
use crate::ring::Producer;
use crate::stats::{bump, RxCounters};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RxState {
    /// Waiting for an address byte for this node
    Filtering,
    /// Inside a frame addressed to this node
    Receiving {
        start: usize,
        received: usize,
        header: [u8; HEADER_SIZE],
        frame_len: Option<usize>,
    },
}

enum Progress {
    Continue,
    Complete,
    Rejected,
}

/// Receive state machine, owned by the receive interrupt
pub struct Receiver<'a, R, const N: usize> {
    rx: R,
    ring: Producer<'a, N>,
    faults: &'a FaultLatch,
    counters: &'a RxCounters,
    config: NodeConfig,
    state: RxState,
}

impl<'a, R: MultidropRx, const N: usize> Receiver<'a, R, N> {
    pub(crate) fn new(
        rx: R,
        ring: Producer<'a, N>,
        faults: &'a FaultLatch,
        counters: &'a RxCounters,
        config: NodeConfig,
    ) -> Self {
        Self {
            rx,
            ring,
            faults,
            counters,
            config,
            state: RxState::Filtering,
        }
    }

    /// Handle one receive interrupt event
    pub fn on_event(&mut self, event: RxEvent) {
        match event {
            RxEvent::Byte {
                data,
                address: true,
            } => self.on_address(data),
            RxEvent::Byte {
                data,
                address: false,
            } => self.on_data(data),
            RxEvent::Error(error) => {
                bump(&self.counters.line_errors);
                self.fault(FaultKind::Line(error));
            }
        }
    }

    /// Whether a frame for this node is being received
    pub fn is_receiving(&self) -> bool {
        matches!(self.state, RxState::Receiving { .. })
    }

    /// Parameters used to accept addresses
    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// The UART half, for platforms that read events through it
    pub fn uart(&mut self) -> &mut R {
        &mut self.rx
    }

    fn on_address(&mut self, address: u8) {
        if self.is_receiving() {
            bump(&self.counters.truncated);
            self.fault(FaultKind::Truncated);
        }

        if !self.config.accepts(address) {
            bump(&self.counters.foreign_addresses);
            return;
        }

        self.rx.disable_address_filter();
        bump(&self.counters.frames_accepted);
        self.state = RxState::Receiving {
            start: self.ring.position(),
            received: 0,
            header: [0; HEADER_SIZE],
            frame_len: None,
        };
        self.store(address);
    }

    fn on_data(&mut self, byte: u8) {
        // Platforms without hardware filtering deliver every byte
        if self.is_receiving() {
            self.store(byte);
        }
    }

    fn store(&mut self, byte: u8) {
        if self.ring.push(byte).is_err() {
            bump(&self.counters.overflows);
            self.fault(FaultKind::Overflow);
            return;
        }

        match self.track(byte) {
            Progress::Continue => {}
            Progress::Complete => {
                bump(&self.counters.frames_completed);
                self.rearm();
            }
            Progress::Rejected => {
                bump(&self.counters.rejected_headers);
                self.rearm();
            }
        }
    }

    fn track(&mut self, byte: u8) -> Progress {
        let RxState::Receiving {
            received,
            header,
            frame_len,
            ..
        } = &mut self.state
        else {
            return Progress::Continue;
        };

        if let Some(slot) = header.get_mut(*received) {
            *slot = byte;
        }
        *received += 1;

        if *received == HEADER_SIZE {
            match validate_header(&header[..]) {
                Ok(parsed) if header_fits(&parsed, N) => *frame_len = Some(parsed.frame_len()),
                _ => return Progress::Rejected,
            }
        }

        if *frame_len == Some(*received) {
            Progress::Complete
        } else {
            Progress::Continue
        }
    }

    /// Abandon the frame in flight, if any, and report why
    fn fault(&mut self, kind: FaultKind) {
        let end = self.ring.position();
        let start = match self.state {
            RxState::Receiving { start, .. } => start,
            RxState::Filtering => end,
        };
        self.faults.raise(kind, start, end);
        self.rearm();
    }

    fn rearm(&mut self) {
        self.rx.enable_address_filter();
        self.state = RxState::Filtering;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ring::RingBuffer;
    use hausbus_hal::mock::MockBus;
    use hausbus_hal::RxError;
    use hausbus_protocol::encode_to_vec;
    use portable_atomic::Ordering;

    fn feed<R: MultidropRx, const N: usize>(receiver: &mut Receiver<'_, R, N>, frame: &[u8]) {
        if let Some((&first, rest)) = frame.split_first() {
            receiver.on_event(RxEvent::address(first));
            for &byte in rest {
                receiver.on_event(RxEvent::data(byte));
            }
        }
    }

    #[test]
    fn test_accepts_own_frame_and_rearms_once() {
        let bus = MockBus::new();
        let faults = FaultLatch::new();
        let counters = RxCounters::new();
        let mut ring = RingBuffer::<64>::new();
        let (producer, consumer) = ring.split();
        let mut receiver =
            Receiver::new(bus.uart(), producer, &faults, &counters, NodeConfig::new(1));

        let frame = encode_to_vec(0x01, 0x00, b"ping").unwrap();
        feed(&mut receiver, &frame);

        assert_eq!(consumer.occupancy(), frame.len());
        assert!(!receiver.is_receiving());
        assert_eq!(bus.filter_disables(), 1);
        assert_eq!(bus.filter_enables(), 1);
        assert!(bus.filter_enabled());
        assert_eq!(counters.frames_completed.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_foreign_frame_leaves_nothing() {
        let bus = MockBus::new();
        let faults = FaultLatch::new();
        let counters = RxCounters::new();
        let mut ring = RingBuffer::<64>::new();
        let (producer, consumer) = ring.split();
        let mut receiver =
            Receiver::new(bus.uart(), producer, &faults, &counters, NodeConfig::new(1));

        let frame = encode_to_vec(0x02, 0x00, b"ping").unwrap();
        feed(&mut receiver, &frame);

        assert_eq!(consumer.occupancy(), 0);
        assert_eq!(bus.filter_disables(), 0);
        assert_eq!(counters.foreign_addresses.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_group_and_broadcast_accepted() {
        let bus = MockBus::new();
        let faults = FaultLatch::new();
        let counters = RxCounters::new();
        let mut ring = RingBuffer::<128>::new();
        let (producer, consumer) = ring.split();
        let config = NodeConfig::new(1).with_group(60).unwrap();
        let mut receiver = Receiver::new(bus.uart(), producer, &faults, &counters, config);

        let group = encode_to_vec(60, 0x00, b"x").unwrap();
        let broadcast = encode_to_vec(0xFF, 0x00, b"y").unwrap();
        feed(&mut receiver, &group);
        feed(&mut receiver, &broadcast);

        assert_eq!(consumer.occupancy(), group.len() + broadcast.len());
    }

    #[test]
    fn test_bad_header_rearms_early() {
        let bus = MockBus::new();
        let faults = FaultLatch::new();
        let counters = RxCounters::new();
        let mut ring = RingBuffer::<64>::new();
        let (producer, consumer) = ring.split();
        let mut receiver =
            Receiver::new(bus.uart(), producer, &faults, &counters, NodeConfig::new(1));

        let mut frame = encode_to_vec(0x01, 0x00, b"ping").unwrap();
        frame[2] ^= 0x01;
        feed(&mut receiver, &frame);

        // Header bytes stay for the poll side to skip; payload is filtered
        assert_eq!(consumer.occupancy(), HEADER_SIZE);
        assert_eq!(counters.rejected_headers.load(Ordering::Relaxed), 1);
        assert_eq!(bus.filter_enables(), 1);
    }

    #[test]
    fn test_new_address_truncates_frame() {
        let bus = MockBus::new();
        let faults = FaultLatch::new();
        let counters = RxCounters::new();
        let mut ring = RingBuffer::<64>::new();
        let (producer, consumer) = ring.split();
        let mut receiver =
            Receiver::new(bus.uart(), producer, &faults, &counters, NodeConfig::new(1));

        let frame = encode_to_vec(0x01, 0x00, b"ping").unwrap();
        feed(&mut receiver, &frame[..8]);
        feed(&mut receiver, &frame);

        let fault = faults.pending(0).unwrap();
        assert_eq!(fault.kind, FaultKind::Truncated);
        assert_eq!((fault.start, fault.end), (0, 8));
        assert_eq!(consumer.occupancy(), 8 + frame.len());
    }

    #[test]
    fn test_line_error_raises_fault() {
        let bus = MockBus::new();
        let faults = FaultLatch::new();
        let counters = RxCounters::new();
        let mut ring = RingBuffer::<64>::new();
        let (producer, _consumer) = ring.split();
        let mut receiver =
            Receiver::new(bus.uart(), producer, &faults, &counters, NodeConfig::new(1));

        receiver.on_event(RxEvent::address(0x01));
        receiver.on_event(RxEvent::data(0x00));
        receiver.on_event(RxEvent::Error(RxError::Framing));

        assert!(!receiver.is_receiving());
        assert!(bus.filter_enabled());
        let fault = faults.pending(0).unwrap();
        assert_eq!(fault.kind, FaultKind::Line(RxError::Framing));
        assert_eq!((fault.start, fault.end), (0, 2));
        assert_eq!(counters.line_errors.load(Ordering::Relaxed), 1);
    }

    #[test]
    fn test_line_error_while_filtering_abandons_nothing() {
        let bus = MockBus::new();
        let faults = FaultLatch::new();
        let counters = RxCounters::new();
        let mut ring = RingBuffer::<64>::new();
        let (producer, consumer) = ring.split();
        let mut receiver =
            Receiver::new(bus.uart(), producer, &faults, &counters, NodeConfig::new(1));

        let frame = encode_to_vec(0x01, 0x00, b"ping").unwrap();
        feed(&mut receiver, &frame);
        receiver.on_event(RxEvent::Error(RxError::Overrun));

        let fault = faults.pending(0).unwrap();
        assert_eq!((fault.start, fault.end), (frame.len(), frame.len()));
        assert_eq!(consumer.occupancy(), frame.len());
    }

    #[test]
    fn test_overflow_raises_fault() {
        let bus = MockBus::new();
        let faults = FaultLatch::new();
        let counters = RxCounters::new();
        let mut ring = RingBuffer::<16>::new();
        let (producer, consumer) = ring.split();
        let mut receiver =
            Receiver::new(bus.uart(), producer, &faults, &counters, NodeConfig::new(1));

        // Two 10-byte frames, the second overflows
        let frame = encode_to_vec(0x01, 0x00, b"ping").unwrap();
        feed(&mut receiver, &frame);
        feed(&mut receiver, &frame);

        assert_eq!(consumer.occupancy(), 16);
        let fault = faults.pending(0).unwrap();
        assert_eq!(fault.kind, FaultKind::Overflow);
        // Only the second frame is abandoned
        assert_eq!((fault.start, fault.end), (10, 16));
        assert_eq!(counters.overflows.load(Ordering::Relaxed), 1);
    }
}
