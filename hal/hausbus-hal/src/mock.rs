//! Host-side doubles for the multi-drop UART and the driver-enable pin
//!
//! A [`MockBus`] records everything the engine does to the hardware. The
//! handles it hands out ([`MockUart`], [`MockPin`], [`MockTrigger`]) borrow
//! it, so a test can move them into the engine and still inspect the
//! recorded state afterwards.

use core::cell::{Cell, RefCell};

use heapless::Vec;

use crate::gpio::OutputPin;
use crate::uart::{MultidropRx, MultidropTx, MultidropUart, TxInterrupt, TxTrigger, UartConfig};

/// Capacity of the transmit log
pub const MOCK_TX_LOG: usize = 256;

/// Recorded hardware state
#[derive(Debug, Default)]
pub struct MockBus {
    filter_enabled: Cell<bool>,
    filter_enables: Cell<u32>,
    filter_disables: Cell<u32>,
    next_is_address: Cell<bool>,
    written: RefCell<Vec<(u8, bool), MOCK_TX_LOG>>,
    listen_empty: Cell<bool>,
    listen_complete: Cell<bool>,
    triggers: Cell<u32>,
    config: Cell<Option<UartConfig>>,
    de_high: Cell<bool>,
    de_rises: Cell<u32>,
}

impl MockBus {
    /// Fresh bus: filter off, nothing written, DE low
    pub fn new() -> Self {
        Self::default()
    }

    /// Whole-peripheral handle (also usable as either half)
    pub fn uart(&self) -> MockUart<'_> {
        MockUart { bus: self }
    }

    /// Driver-enable pin handle
    pub fn pin(&self) -> MockPin<'_> {
        MockPin { bus: self }
    }

    /// Transmit interrupt trigger handle
    pub fn trigger(&self) -> MockTrigger<'_> {
        MockTrigger { bus: self }
    }

    /// Whether address filtering is currently armed
    pub fn filter_enabled(&self) -> bool {
        self.filter_enabled.get()
    }

    /// Number of times filtering was armed
    pub fn filter_enables(&self) -> u32 {
        self.filter_enables.get()
    }

    /// Number of times filtering was disarmed
    pub fn filter_disables(&self) -> u32 {
        self.filter_disables.get()
    }

    /// Bytes written so far, with their address marks
    pub fn written(&self) -> Vec<(u8, bool), MOCK_TX_LOG> {
        self.written.borrow().clone()
    }

    /// Only the byte values written so far
    pub fn written_bytes(&self) -> Vec<u8, MOCK_TX_LOG> {
        self.written.borrow().iter().map(|&(b, _)| b).collect()
    }

    /// Forget the transmit log
    pub fn clear_written(&self) {
        self.written.borrow_mut().clear();
    }

    /// Whether an interrupt source is enabled
    pub fn is_listening(&self, interrupt: TxInterrupt) -> bool {
        match interrupt {
            TxInterrupt::BufferEmpty => self.listen_empty.get(),
            TxInterrupt::Complete => self.listen_complete.get(),
        }
    }

    /// Number of transmit interrupt requests from the poll side
    pub fn triggers(&self) -> u32 {
        self.triggers.get()
    }

    /// Configuration applied by `configure`, if any
    pub fn config(&self) -> Option<UartConfig> {
        self.config.get()
    }

    /// Current driver-enable level
    pub fn de_high(&self) -> bool {
        self.de_high.get()
    }

    /// Number of low-to-high DE transitions
    pub fn de_rises(&self) -> u32 {
        self.de_rises.get()
    }
}

/// UART handle over a [`MockBus`]
#[derive(Debug, Clone, Copy)]
pub struct MockUart<'a> {
    bus: &'a MockBus,
}

impl MultidropRx for MockUart<'_> {
    fn enable_address_filter(&mut self) {
        self.bus.filter_enabled.set(true);
        self.bus.filter_enables.set(self.bus.filter_enables.get() + 1);
    }

    fn disable_address_filter(&mut self) {
        self.bus.filter_enabled.set(false);
        self.bus
            .filter_disables
            .set(self.bus.filter_disables.get() + 1);
    }
}

impl MultidropTx for MockUart<'_> {
    fn mark_next_tx_byte_as_address(&mut self) {
        self.bus.next_is_address.set(true);
    }

    fn write_byte(&mut self, byte: u8) {
        let address = self.bus.next_is_address.replace(false);
        self.bus
            .written
            .borrow_mut()
            .push((byte, address))
            .expect("mock transmit log full");
    }

    fn listen(&mut self, interrupt: TxInterrupt) {
        match interrupt {
            TxInterrupt::BufferEmpty => self.bus.listen_empty.set(true),
            TxInterrupt::Complete => self.bus.listen_complete.set(true),
        }
    }

    fn unlisten(&mut self, interrupt: TxInterrupt) {
        match interrupt {
            TxInterrupt::BufferEmpty => self.bus.listen_empty.set(false),
            TxInterrupt::Complete => self.bus.listen_complete.set(false),
        }
    }
}

impl MultidropUart for MockUart<'_> {
    type Error = core::convert::Infallible;

    fn configure(&mut self, config: &UartConfig) -> Result<(), Self::Error> {
        self.bus.config.set(Some(*config));
        Ok(())
    }
}

/// Driver-enable pin over a [`MockBus`]
#[derive(Debug, Clone, Copy)]
pub struct MockPin<'a> {
    bus: &'a MockBus,
}

impl OutputPin for MockPin<'_> {
    fn set_high(&mut self) {
        if !self.bus.de_high.replace(true) {
            self.bus.de_rises.set(self.bus.de_rises.get() + 1);
        }
    }

    fn set_low(&mut self) {
        self.bus.de_high.set(false);
    }

    fn is_set_high(&self) -> bool {
        self.bus.de_high.get()
    }
}

/// Transmit trigger over a [`MockBus`]
#[derive(Debug, Clone, Copy)]
pub struct MockTrigger<'a> {
    bus: &'a MockBus,
}

impl TxTrigger for MockTrigger<'_> {
    fn trigger(&mut self) {
        self.bus.triggers.set(self.bus.triggers.get() + 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_address_mark_applies_to_one_byte() {
        let bus = MockBus::new();
        let mut uart = bus.uart();
        uart.mark_next_tx_byte_as_address();
        uart.write_byte(0x05);
        uart.write_byte(0x06);

        assert_eq!(bus.written().as_slice(), &[(0x05, true), (0x06, false)]);
    }

    #[test]
    fn test_de_rises_counted_once_per_edge() {
        let bus = MockBus::new();
        let mut pin = bus.pin();
        pin.set_high();
        pin.set_high();
        pin.set_low();
        pin.set_high();

        assert_eq!(bus.de_rises(), 2);
        assert!(bus.de_high());
    }
}
