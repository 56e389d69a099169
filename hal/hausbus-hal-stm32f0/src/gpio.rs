//! Driver-enable pin for STM32F0 boards
//!
//! Wraps any embedded-hal output (typically `embassy_stm32::gpio::Output`)
//! as a `hausbus-hal` pin. The level is tracked locally so reading it back
//! needs no `&mut` access to the underlying pin.

use embedded_hal::digital::OutputPin as HalOutputPin;
use hausbus_hal::OutputPin;

/// RS-485 driver-enable line
pub struct DePin<P> {
    pin: P,
    high: bool,
}

impl<P: HalOutputPin> DePin<P> {
    /// Wrap a pin, driving it low
    pub fn new(mut pin: P) -> Self {
        // GPIO writes on this chip are infallible
        let _ = pin.set_low();
        Self { pin, high: false }
    }
}

impl<P: HalOutputPin> OutputPin for DePin<P> {
    fn set_high(&mut self) {
        let _ = self.pin.set_high();
        self.high = true;
    }

    fn set_low(&mut self) {
        let _ = self.pin.set_low();
        self.high = false;
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}
