//! GPIO pin abstractions
//!
//! The transport only drives one pin: the RS-485 driver-enable (DE) line,
//! asserted while this node owns the bus.

/// Digital output pin
///
/// Implementations should handle the actual hardware register manipulation
/// for the specific chip.
pub trait OutputPin {
    /// Set the pin high (logic 1)
    fn set_high(&mut self);

    /// Set the pin low (logic 0)
    fn set_low(&mut self);

    /// Set the pin to a specific state
    fn set_state(&mut self, high: bool) {
        if high {
            self.set_high();
        } else {
            self.set_low();
        }
    }

    /// Check if the pin is currently set high
    fn is_set_high(&self) -> bool;
}

/// Driver-enable line with configurable polarity
///
/// Most transceivers (MAX485 and friends) enable the driver on a high DE
/// level. Boards that route DE through an inverting buffer set
/// `active_low`.
#[derive(Debug)]
pub struct DriverEnable<P> {
    pin: P,
    active_low: bool,
}

impl<P: OutputPin> DriverEnable<P> {
    /// Wrap a pin; the line is released (receive mode) immediately
    pub fn new(pin: P, active_low: bool) -> Self {
        let mut de = Self { pin, active_low };
        de.release();
        de
    }

    /// Enable the bus driver (transmit mode)
    pub fn assert(&mut self) {
        self.pin.set_state(!self.active_low);
    }

    /// Disable the bus driver (receive mode)
    pub fn release(&mut self) {
        self.pin.set_state(self.active_low);
    }

    /// Whether the driver is currently enabled
    pub fn is_asserted(&self) -> bool {
        self.pin.is_set_high() != self.active_low
    }

    /// Give back the underlying pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Pin(bool);

    impl OutputPin for Pin {
        fn set_high(&mut self) {
            self.0 = true;
        }
        fn set_low(&mut self) {
            self.0 = false;
        }
        fn is_set_high(&self) -> bool {
            self.0
        }
    }

    #[test]
    fn test_driver_enable_active_high() {
        let mut de = DriverEnable::new(Pin(true), false);
        assert!(!de.is_asserted());
        de.assert();
        assert!(de.is_asserted());
        assert!(de.into_inner().0);
    }

    #[test]
    fn test_driver_enable_active_low() {
        let mut de = DriverEnable::new(Pin(false), true);
        // Released means the pin sits high
        assert!(!de.is_asserted());
        de.assert();
        assert!(de.is_asserted());
        de.release();
        assert!(de.into_inner().0);
    }
}
