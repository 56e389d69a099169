//! Bus engine
//!
//! [`BusEngine`] owns all transport state. Splitting it hands out three
//! handles, one per execution context:
//!
//! - [`Receiver`] for the UART receive interrupt
//! - [`TxPump`] for the UART transmit interrupt
//! - [`Bus`] for the application's poll loop
//!
//! The handles only share atomics, so none of them needs a lock.
//!
//! # Example
//!
//! ```ignore
//! let engine = ENGINE.init(BusEngine::new());
//! bus_init(&mut uart, &mut de_pin, &config)?;
//! let (mut bus, receiver, pump) = engine.split(config, uart_rx, uart_tx, de_pin, trigger);
//!
//! loop {
//!     match bus.bus_status() {
//!         BusStatus::CompleteFrame => {
//!             if let Some(frame) = bus.current_frame() {
//!                 handle(frame);
//!             }
//!             bus.packet_done();
//!         }
//!         BusStatus::HeaderChecksumMismatch => {
//!             bus.skip_byte();
//!         }
//!         BusStatus::Faulted => {
//!             bus.recover();
//!         }
//!         BusStatus::Idle => {}
//!     }
//! }
//! ```

use hausbus_hal::gpio::DriverEnable;
use hausbus_hal::{MultidropRx, MultidropTx, MultidropUart, OutputPin, TxTrigger};
use hausbus_protocol::{encode_frame, Frame, FrameBuf, Header, HEADER_SIZE, MAX_FRAME_SIZE};

use crate::config::NodeConfig;
use crate::detector::{detect, BusStatus, Detection};
use crate::fault::{Fault, FaultKind, FaultLatch};
use crate::receiver::Receiver;
use crate::ring::{Consumer, RingBuffer};
use crate::stats::{BusStats, RxCounters, TxCounters};
use crate::transmit::{SendError, TxPhase, TxPump, TxSlot};

/// Default receive ring size
pub const RX_BUFFER_SIZE: usize = 64;

/// Prepare the UART and the transceiver before the engine is split
///
/// Applies 9N1 multi-drop framing at the configured rate, arms address
/// filtering and puts the transceiver into receive mode.
pub fn bus_init<U, P>(uart: &mut U, de: &mut P, config: &NodeConfig) -> Result<(), U::Error>
where
    U: MultidropUart,
    P: OutputPin,
{
    uart.configure(&config.uart_config())?;
    uart.enable_address_filter();
    de.set_state(config.de_active_low);
    bus_debug!(
        "bus initialised: address {}, {} baud",
        config.address,
        config.baudrate
    );
    Ok(())
}

/// All transport state of one node
///
/// `N` is the receive ring size and must be a power of two. Frames longer
/// than the ring are rejected.
pub struct BusEngine<const N: usize = RX_BUFFER_SIZE> {
    ring: RingBuffer<N>,
    faults: FaultLatch,
    rx_counters: RxCounters,
    tx_counters: TxCounters,
    tx_slot: TxSlot,
}

impl<const N: usize> BusEngine<N> {
    const HOLDS_HEADER: () = assert!(N >= HEADER_SIZE, "receive ring smaller than a header");

    /// Create an engine with empty buffers
    pub const fn new() -> Self {
        Self {
            ring: RingBuffer::new(),
            faults: FaultLatch::new(),
            rx_counters: RxCounters::new(),
            tx_counters: TxCounters::new(),
            tx_slot: TxSlot::new(),
        }
    }

    /// Hand out the receive, transmit and poll handles
    ///
    /// `de` is the raw driver-enable pin; its polarity comes from `config`.
    #[allow(clippy::type_complexity)]
    pub fn split<R, T, P, K>(
        &mut self,
        config: NodeConfig,
        rx: R,
        tx: T,
        de: P,
        trigger: K,
    ) -> (Bus<'_, N, K>, Receiver<'_, R, N>, TxPump<'_, T, P>)
    where
        R: MultidropRx,
        T: MultidropTx,
        P: OutputPin,
        K: TxTrigger,
    {
        #[allow(clippy::let_unit_value)]
        let () = Self::HOLDS_HEADER;

        let de = DriverEnable::new(de, config.de_active_low);
        let (producer, consumer) = self.ring.split();

        let bus = Bus {
            ring: consumer,
            faults: &self.faults,
            rx_counters: &self.rx_counters,
            tx_counters: &self.tx_counters,
            tx_slot: &self.tx_slot,
            trigger,
            handled_faults: 0,
            retired: 0,
            skipped: 0,
            flushed: 0,
            snapshot: [0; MAX_FRAME_SIZE],
        };
        let receiver = Receiver::new(rx, producer, &self.faults, &self.rx_counters, config);
        let pump = TxPump::new(tx, de, &self.tx_slot, &self.tx_counters);

        (bus, receiver, pump)
    }
}

impl<const N: usize> Default for BusEngine<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll-side handle
pub struct Bus<'a, const N: usize, K> {
    ring: Consumer<'a, N>,
    faults: &'a FaultLatch,
    rx_counters: &'a RxCounters,
    tx_counters: &'a TxCounters,
    tx_slot: &'a TxSlot,
    trigger: K,
    handled_faults: u32,
    retired: u32,
    skipped: u32,
    flushed: u32,
    snapshot: [u8; MAX_FRAME_SIZE],
}

impl<const N: usize, K: TxTrigger> Bus<'_, N, K> {
    /// Current receive state
    ///
    /// Computed from the buffered bytes on every call. Frames that arrived
    /// before a fault are still reported; the bus turns `Faulted` once the
    /// read cursor reaches the abandoned frame.
    pub fn bus_status(&self) -> BusStatus {
        let fault = self.pending_fault();
        match detect(&self.ring, self.readable(fault.as_ref())) {
            Detection::Idle if fault.is_some() => BusStatus::Faulted,
            detection => detection.status(),
        }
    }

    /// Copy of the frame at the read cursor
    ///
    /// Only available while the status is [`BusStatus::CompleteFrame`]. The
    /// frame stays buffered until [`Bus::packet_done`].
    pub fn current_frame(&mut self) -> Option<Frame<'_>> {
        let header = self.complete_header()?;

        let window = &mut self.snapshot[..header.frame_len()];
        self.ring.peek_window(0, window);
        Frame::parse(window).ok()
    }

    /// Owned copy of the frame at the read cursor
    ///
    /// For callers that need the frame while they keep using the bus, for
    /// example to answer it.
    pub fn copy_frame(&self) -> Option<FrameBuf> {
        let header = self.complete_header()?;

        let mut frame = FrameBuf::new();
        frame.resize_default(header.frame_len()).ok()?;
        self.ring.peek_window(0, &mut frame);
        Some(frame)
    }

    /// Retire the frame at the read cursor
    ///
    /// Returns `false` if no complete frame is buffered.
    pub fn packet_done(&mut self) -> bool {
        let Some(header) = self.complete_header() else {
            return false;
        };

        self.ring.advance_read(header.frame_len());
        self.retired = self.retired.wrapping_add(1);
        bus_trace!(
            "frame {} -> {} retired",
            header.source,
            header.destination
        );
        true
    }

    /// Drop one byte to resynchronise after a bad header
    ///
    /// Returns `false` if nothing is buffered.
    pub fn skip_byte(&mut self) -> bool {
        if self.ring.advance_read(1) == 0 {
            return false;
        }
        self.skipped = self.skipped.wrapping_add(1);
        true
    }

    /// Clear the oldest fault raised by the receive interrupt
    ///
    /// Only acts while the status is [`BusStatus::Faulted`]. Drops the
    /// frame the fault abandoned, together with any bytes left in front of
    /// it that can no longer form a frame. Returns the fault that was
    /// cleared, or `None` if the bus was not faulted.
    pub fn recover(&mut self) -> Option<FaultKind> {
        if self.bus_status() != BusStatus::Faulted {
            return None;
        }
        let fault = self.pending_fault()?;

        let flushed = self.ring.advance_to(fault.end);
        self.handled_faults = fault.sequence;
        self.flushed = self.flushed.wrapping_add(flushed as u32);

        bus_warn!(
            "bus fault {:?}, flushed {} bytes",
            fault.kind,
            flushed
        );
        Some(fault.kind)
    }

    /// Encode and queue a frame for transmission
    pub fn send(&mut self, destination: u8, source: u8, payload: &[u8]) -> Result<(), SendError> {
        if self.is_transmitting() {
            return Err(SendError::Busy);
        }

        let mut frame = [0u8; MAX_FRAME_SIZE];
        let len = encode_frame(destination, source, payload, &mut frame)?;
        self.send_frame(&frame[..len])
    }

    /// Queue an already encoded frame for transmission
    pub fn send_frame(&mut self, frame: &[u8]) -> Result<(), SendError> {
        self.tx_slot.load(frame)?;
        self.trigger.trigger();
        bus_trace!("queued {} byte frame", frame.len());
        Ok(())
    }

    /// Whether a frame is still in flight
    pub fn is_transmitting(&self) -> bool {
        self.tx_phase() != TxPhase::Idle
    }

    /// Phase of the transmit state machine
    pub fn tx_phase(&self) -> TxPhase {
        self.tx_slot.phase()
    }

    /// Bytes waiting in the receive ring
    pub fn buffered(&self) -> usize {
        self.ring.occupancy()
    }

    /// Counter snapshot
    pub fn stats(&self) -> BusStats {
        let mut stats = BusStats {
            frames_retired: self.retired,
            bytes_skipped: self.skipped,
            bytes_flushed: self.flushed,
            ..BusStats::default()
        };
        self.rx_counters.fill(&mut stats);
        self.tx_counters.fill(&mut stats);
        stats
    }

    fn pending_fault(&self) -> Option<Fault> {
        self.faults.pending(self.handled_faults)
    }

    /// Bytes the detector may look at: up to the start of the oldest
    /// abandoned frame, or everything without a fault
    fn readable(&self, fault: Option<&Fault>) -> usize {
        let buffered = self.ring.occupancy();
        match fault {
            None => buffered,
            Some(fault) if fault.missed > 0 => 0,
            Some(fault) => {
                let ahead = fault.start.wrapping_sub(self.ring.position());
                // Zero once the read cursor passed the start
                if ahead <= buffered {
                    ahead
                } else {
                    0
                }
            }
        }
    }

    fn complete_header(&self) -> Option<Header> {
        let fault = self.pending_fault();
        match detect(&self.ring, self.readable(fault.as_ref())) {
            Detection::Complete(header) => Some(header),
            _ => None,
        }
    }
}
