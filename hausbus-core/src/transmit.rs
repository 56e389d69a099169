//! Interrupt-driven transmit path
//!
//! The poll side loads one encoded frame into the [`TxSlot`] and kicks the
//! transmit interrupt. From there the [`TxPump`] drives the line:
//!
//! ```text
//!  Idle ──send──▶ Pending ──kick──▶ Sending ──last byte──▶ Draining
//!   ▲                                                         │
//!   └─────────────────────── complete ────────────────────────┘
//! ```
//!
//! The state word is the hand-over: the poll side writes the slot only in
//! `Idle`, the interrupt only touches it after `Pending`.

use hausbus_hal::gpio::DriverEnable;
use hausbus_hal::{MultidropTx, OutputPin, TxEvent, TxInterrupt};
use hausbus_protocol::{FrameError, MAX_FRAME_SIZE};
use portable_atomic::{AtomicU8, AtomicUsize, Ordering};

use crate::stats::TxCounters;

const IDLE: u8 = 0;
const PENDING: u8 = 1;
const SENDING: u8 = 2;
const DRAINING: u8 = 3;

/// Transmit request errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SendError {
    /// A frame is still in flight
    Busy,
    /// The frame could not be encoded
    Frame(FrameError),
}

impl From<FrameError> for SendError {
    fn from(e: FrameError) -> Self {
        SendError::Frame(e)
    }
}

/// Phase of the transmit state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxPhase {
    /// Nothing queued; the slot belongs to the poll side
    Idle,
    /// Frame loaded, waiting for the interrupt to start
    Pending,
    /// Bytes are being written
    Sending,
    /// Last byte written, waiting for the shift register to drain
    Draining,
}

/// One-frame transmit buffer shared by the poll side and the transmit interrupt
pub(crate) struct TxSlot {
    bytes: [AtomicU8; MAX_FRAME_SIZE],
    len: AtomicUsize,
    state: AtomicU8,
}

impl TxSlot {
    pub(crate) const fn new() -> Self {
        Self {
            bytes: [const { AtomicU8::new(0) }; MAX_FRAME_SIZE],
            len: AtomicUsize::new(0),
            state: AtomicU8::new(IDLE),
        }
    }

    pub(crate) fn phase(&self) -> TxPhase {
        match self.state.load(Ordering::Acquire) {
            IDLE => TxPhase::Idle,
            PENDING => TxPhase::Pending,
            SENDING => TxPhase::Sending,
            _ => TxPhase::Draining,
        }
    }

    /// Copy a frame in and mark it pending (poll side only)
    pub(crate) fn load(&self, frame: &[u8]) -> Result<(), SendError> {
        if self.phase() != TxPhase::Idle {
            return Err(SendError::Busy);
        }
        if frame.len() > MAX_FRAME_SIZE {
            return Err(SendError::Frame(FrameError::PayloadTooLarge));
        }
        if frame.is_empty() {
            return Err(SendError::Frame(FrameError::Incomplete));
        }

        for (slot, &byte) in self.bytes.iter().zip(frame) {
            slot.store(byte, Ordering::Relaxed);
        }
        self.len.store(frame.len(), Ordering::Relaxed);
        self.state.store(PENDING, Ordering::Release);
        Ok(())
    }

    fn byte(&self, index: usize) -> Option<u8> {
        if index >= self.len.load(Ordering::Relaxed) {
            return None;
        }
        self.bytes
            .get(index)
            .map(|slot| slot.load(Ordering::Relaxed))
    }

    fn set(&self, state: u8) {
        self.state.store(state, Ordering::Release);
    }
}

/// Transmit state machine, owned by the transmit interrupt
pub struct TxPump<'a, T, P> {
    tx: T,
    de: DriverEnable<P>,
    slot: &'a TxSlot,
    counters: &'a TxCounters,
    cursor: usize,
}

impl<'a, T: MultidropTx, P: OutputPin> TxPump<'a, T, P> {
    pub(crate) fn new(
        tx: T,
        de: DriverEnable<P>,
        slot: &'a TxSlot,
        counters: &'a TxCounters,
    ) -> Self {
        Self {
            tx,
            de,
            slot,
            counters,
            cursor: 0,
        }
    }

    /// Handle one transmit interrupt event
    ///
    /// Events that do not fit the current phase are ignored, so the pump
    /// can be called for every pass of a shared UART interrupt.
    pub fn on_event(&mut self, event: TxEvent) {
        match (self.slot.phase(), event) {
            (TxPhase::Pending, TxEvent::Kick | TxEvent::BufferEmpty) => self.start(),
            (TxPhase::Sending, TxEvent::BufferEmpty) => self.next(),
            (TxPhase::Draining, TxEvent::Complete) => self.finish(),
            _ => {}
        }
    }

    /// The UART half, for platforms that poll interrupt flags through it
    pub fn uart(&self) -> &T {
        &self.tx
    }

    /// Whether this node currently drives the bus
    pub fn is_driving(&self) -> bool {
        self.de.is_asserted()
    }

    fn start(&mut self) {
        let Some(first) = self.slot.byte(0) else {
            self.slot.set(IDLE);
            return;
        };

        self.de.assert();
        self.tx.mark_next_tx_byte_as_address();
        self.tx.write_byte(first);
        self.cursor = 1;
        self.slot.set(SENDING);
        self.tx.listen(TxInterrupt::BufferEmpty);
    }

    fn next(&mut self) {
        match self.slot.byte(self.cursor) {
            Some(byte) => {
                self.tx.write_byte(byte);
                self.cursor += 1;
            }
            None => {
                self.tx.unlisten(TxInterrupt::BufferEmpty);
                self.slot.set(DRAINING);
                self.tx.listen(TxInterrupt::Complete);
            }
        }
    }

    fn finish(&mut self) {
        self.tx.unlisten(TxInterrupt::Complete);
        // Hold the line until the stop bit of the last byte is out
        self.de.release();
        self.counters.frame_sent();
        self.slot.set(IDLE);
    }
}
