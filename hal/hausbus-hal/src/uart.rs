//! Multi-drop UART abstractions
//!
//! The bus uses 9N1 framing: the 9th data bit marks a byte as a node
//! address. A receiver in address-filtering mode ignores data bytes and only
//! wakes for address bytes; the engine decides which addresses are its own.
//!
//! The peripheral is shared by two interrupt contexts, so its capabilities
//! are split: the receive interrupt owns a [`MultidropRx`] half, the
//! transmit interrupt owns a [`MultidropTx`] half, and the poll loop only
//! holds a [`TxTrigger`] to wake the transmit interrupt.

/// Receive errors reported by the line hardware
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxError {
    /// A byte arrived before the previous one was read
    Overrun,
    /// Stop bit missing
    Framing,
    /// Parity check failed
    Parity,
    /// Noise detected on the line
    Noise,
}

/// One event from the receive interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RxEvent {
    /// A byte was received; `address` is the 9th bit
    Byte { data: u8, address: bool },
    /// The hardware flagged a line error; the byte (if any) is lost
    Error(RxError),
}

impl RxEvent {
    /// Address byte event
    pub const fn address(data: u8) -> Self {
        RxEvent::Byte {
            data,
            address: true,
        }
    }

    /// Data byte event
    pub const fn data(data: u8) -> Self {
        RxEvent::Byte {
            data,
            address: false,
        }
    }
}

/// Transmit-side interrupt sources
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxInterrupt {
    /// Transmit data register empty, next byte may be written
    BufferEmpty,
    /// Last byte fully shifted out onto the line
    Complete,
}

/// One event from the transmit interrupt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TxEvent {
    /// The transmit data register is free
    BufferEmpty,
    /// The shift register drained
    Complete,
    /// Raised through [`TxTrigger`] when a new frame was queued
    Kick,
}

/// Receive half of a multi-drop UART
pub trait MultidropRx {
    /// Ignore data bytes until the next address byte
    fn enable_address_filter(&mut self);

    /// Accept every byte as data
    fn disable_address_filter(&mut self);
}

/// Transmit half of a multi-drop UART
pub trait MultidropTx {
    /// Set the 9th bit on the next byte written
    fn mark_next_tx_byte_as_address(&mut self);

    /// Write one byte into the transmit data register
    ///
    /// Called only after a [`TxInterrupt::BufferEmpty`] event (or the initial
    /// kick), so the register is known to be free.
    fn write_byte(&mut self, byte: u8);

    /// Enable an interrupt source
    fn listen(&mut self, interrupt: TxInterrupt);

    /// Disable an interrupt source
    fn unlisten(&mut self, interrupt: TxInterrupt);
}

/// Poll-side handle that makes the transmit interrupt run
///
/// Platforms typically pend the UART interrupt; the transmit pump then sees a
/// [`TxEvent::Kick`].
pub trait TxTrigger {
    /// Request the transmit interrupt
    fn trigger(&mut self);
}

/// Whole peripheral, used once before it is split between interrupts
pub trait MultidropUart: MultidropRx + MultidropTx {
    /// Error type for configuration
    type Error;

    /// Apply baud rate and 9-bit framing, enable receiver and transmitter
    fn configure(&mut self, config: &UartConfig) -> Result<(), Self::Error>;
}

/// UART configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct UartConfig {
    /// Baud rate in bits per second
    pub baudrate: u32,
    /// Number of data bits (Nine for multi-drop)
    pub data_bits: DataBits,
    /// Parity mode
    pub parity: Parity,
    /// Number of stop bits
    pub stop_bits: StopBits,
}

/// Bus baud rate shared by all nodes
pub const DEFAULT_BAUDRATE: u32 = 9600;

impl UartConfig {
    /// 9N1 multi-drop framing at the given rate
    pub const fn multidrop(baudrate: u32) -> Self {
        Self {
            baudrate,
            data_bits: DataBits::Nine,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl Default for UartConfig {
    fn default() -> Self {
        Self::multidrop(DEFAULT_BAUDRATE)
    }
}

/// Number of data bits per frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DataBits {
    Seven,
    Eight,
    Nine,
}

/// Parity mode
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Parity {
    None,
    Even,
    Odd,
}

/// Number of stop bits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum StopBits {
    One,
    Two,
}
