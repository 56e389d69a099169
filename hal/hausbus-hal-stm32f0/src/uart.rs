//! Multi-drop USART for STM32F0
//!
//! embassy-stm32 brings the peripheral up (clocks, pins, baud rate, 9-bit
//! word length). Byte traffic then runs from the USART interrupt through
//! raw register access, because the engine needs the 9th bit of every
//! received word and must set it on the first transmitted byte.
//!
//! The hardware address matcher only knows one address, while a node also
//! listens to group and broadcast addresses. Address filtering is therefore
//! done in software: while filtering, data words are dropped in the
//! interrupt before they reach the engine.

use embassy_stm32::interrupt::InterruptExt;
use embassy_stm32::mode::Blocking;
use embassy_stm32::pac::usart::Usart;
use embassy_stm32::pac::Interrupt;
use embassy_stm32::usart::{self, ConfigError, Uart};
use hausbus_hal::uart::{DataBits, Parity, StopBits};
use hausbus_hal::{
    MultidropRx, MultidropTx, MultidropUart, RxError, RxEvent, TxEvent, TxInterrupt, TxTrigger,
    UartConfig,
};

// CR1
const CR1_RXNEIE: u32 = 1 << 5;
const CR1_TCIE: u32 = 1 << 6;
const CR1_TXEIE: u32 = 1 << 7;
// CR3
const CR3_EIE: u32 = 1 << 0;
// ISR / ICR
const ISR_PE: u32 = 1 << 0;
const ISR_FE: u32 = 1 << 1;
const ISR_NF: u32 = 1 << 2;
const ISR_ORE: u32 = 1 << 3;
const ISR_RXNE: u32 = 1 << 5;
const ISR_TC: u32 = 1 << 6;
const ISR_TXE: u32 = 1 << 7;
const ISR_ERRORS: u32 = ISR_PE | ISR_FE | ISR_NF | ISR_ORE;

/// 9th bit of a data word
const ADDRESS_BIT: u32 = 1 << 8;

fn line_error(isr: u32) -> Option<RxError> {
    if isr & ISR_ORE != 0 {
        Some(RxError::Overrun)
    } else if isr & ISR_FE != 0 {
        Some(RxError::Framing)
    } else if isr & ISR_PE != 0 {
        Some(RxError::Parity)
    } else if isr & ISR_NF != 0 {
        Some(RxError::Noise)
    } else {
        None
    }
}

fn embassy_config(config: &UartConfig) -> Result<usart::Config, ConfigError> {
    let mut out = usart::Config::default();
    out.baudrate = config.baudrate;
    out.data_bits = match config.data_bits {
        DataBits::Eight => usart::DataBits::DataBits8,
        DataBits::Nine => usart::DataBits::DataBits9,
        DataBits::Seven => return Err(ConfigError::DataParityNotSupported),
    };
    out.parity = match config.parity {
        Parity::None => usart::Parity::ParityNone,
        Parity::Even => usart::Parity::ParityEven,
        Parity::Odd => usart::Parity::ParityOdd,
    };
    out.stop_bits = match config.stop_bits {
        StopBits::One => usart::StopBits::STOP1,
        StopBits::Two => usart::StopBits::STOP2,
    };
    Ok(out)
}

/// Whole USART, used for setup before the halves move into the interrupt
///
/// Keep this value alive: dropping the embassy driver disables the
/// peripheral.
pub struct MultidropUsart<'d> {
    uart: Uart<'d, Blocking>,
    rx: UsartRx,
    tx: UsartTx,
}

impl<'d> MultidropUsart<'d> {
    /// Wrap an embassy UART and the register block of the same instance
    pub fn new(uart: Uart<'d, Blocking>, regs: Usart) -> Self {
        Self {
            uart,
            rx: UsartRx::new(regs),
            tx: UsartTx::new(regs),
        }
    }

    /// Interrupt-side halves
    ///
    /// Both start in address-filtering mode with no transmit interrupt
    /// enabled.
    pub fn halves(&self) -> (UsartRx, UsartTx) {
        (
            UsartRx::new(self.rx.regs),
            UsartTx::new(self.tx.regs),
        )
    }
}

impl MultidropRx for MultidropUsart<'_> {
    fn enable_address_filter(&mut self) {
        self.rx.enable_address_filter();
    }

    fn disable_address_filter(&mut self) {
        self.rx.disable_address_filter();
    }
}

impl MultidropTx for MultidropUsart<'_> {
    fn mark_next_tx_byte_as_address(&mut self) {
        self.tx.mark_next_tx_byte_as_address();
    }

    fn write_byte(&mut self, byte: u8) {
        self.tx.write_byte(byte);
    }

    fn listen(&mut self, interrupt: TxInterrupt) {
        self.tx.listen(interrupt);
    }

    fn unlisten(&mut self, interrupt: TxInterrupt) {
        self.tx.unlisten(interrupt);
    }
}

impl MultidropUart for MultidropUsart<'_> {
    type Error = ConfigError;

    fn configure(&mut self, config: &UartConfig) -> Result<(), Self::Error> {
        let config = embassy_config(config)?;
        let (tx, rx) = self.uart.split_ref();
        tx.set_config(&config)?;
        rx.set_config(&config)?;

        // Reconfiguring rewrites CR1, so interrupt enables come after it
        let regs = self.rx.regs;
        let _ = regs.isr().read();
        regs.icr().write(|w| w.0 = ISR_ERRORS | ISR_TC);
        regs.cr3().modify(|w| w.0 |= CR3_EIE);
        regs.cr1().modify(|w| w.0 |= CR1_RXNEIE);
        Ok(())
    }
}

/// Receive half, owned by the USART interrupt
pub struct UsartRx {
    regs: Usart,
    filtering: bool,
}

impl UsartRx {
    fn new(regs: Usart) -> Self {
        Self {
            regs,
            filtering: true,
        }
    }

    /// Fetch the next receive event, if the interrupt was raised for one
    ///
    /// Line errors are cleared and reported; the byte that carried them is
    /// discarded. Data words are dropped while filtering.
    pub fn read_event(&mut self) -> Option<RxEvent> {
        let isr = self.regs.isr().read().0;

        if let Some(error) = line_error(isr) {
            if isr & ISR_RXNE != 0 {
                let _ = self.regs.rdr().read();
            }
            self.regs.icr().write(|w| w.0 = isr & ISR_ERRORS);
            return Some(RxEvent::Error(error));
        }

        if isr & ISR_RXNE == 0 {
            return None;
        }

        let word = self.regs.rdr().read().0;
        let address = word & ADDRESS_BIT != 0;
        if self.filtering && !address {
            return None;
        }
        Some(RxEvent::Byte {
            data: word as u8,
            address,
        })
    }
}

impl MultidropRx for UsartRx {
    fn enable_address_filter(&mut self) {
        self.filtering = true;
    }

    fn disable_address_filter(&mut self) {
        self.filtering = false;
    }
}

/// Transmit half, owned by the USART interrupt
pub struct UsartTx {
    regs: Usart,
    address_next: bool,
}

impl UsartTx {
    fn new(regs: Usart) -> Self {
        Self {
            regs,
            address_next: false,
        }
    }

    /// Transmit event the interrupt was raised for, if any
    ///
    /// Only enabled sources are reported; TXE is permanently set while the
    /// line is idle.
    pub fn pending_event(&self) -> Option<TxEvent> {
        let isr = self.regs.isr().read().0;
        let cr1 = self.regs.cr1().read().0;

        if cr1 & CR1_TXEIE != 0 && isr & ISR_TXE != 0 {
            Some(TxEvent::BufferEmpty)
        } else if cr1 & CR1_TCIE != 0 && isr & ISR_TC != 0 {
            Some(TxEvent::Complete)
        } else {
            None
        }
    }
}

impl MultidropTx for UsartTx {
    fn mark_next_tx_byte_as_address(&mut self) {
        self.address_next = true;
    }

    fn write_byte(&mut self, byte: u8) {
        let mut word = u32::from(byte);
        if core::mem::take(&mut self.address_next) {
            word |= ADDRESS_BIT;
        }
        self.regs.tdr().write(|w| w.0 = word);
    }

    fn listen(&mut self, interrupt: TxInterrupt) {
        let bit = match interrupt {
            TxInterrupt::BufferEmpty => CR1_TXEIE,
            TxInterrupt::Complete => CR1_TCIE,
        };
        self.regs.cr1().modify(|w| w.0 |= bit);
    }

    fn unlisten(&mut self, interrupt: TxInterrupt) {
        let bit = match interrupt {
            TxInterrupt::BufferEmpty => CR1_TXEIE,
            TxInterrupt::Complete => CR1_TCIE,
        };
        self.regs.cr1().modify(|w| w.0 &= !bit);
    }
}

/// Poll-side trigger: pends the USART interrupt line
#[derive(Clone, Copy)]
pub struct UsartTrigger {
    irq: Interrupt,
}

impl UsartTrigger {
    /// Trigger for the given USART interrupt
    pub fn new(irq: Interrupt) -> Self {
        Self { irq }
    }
}

impl TxTrigger for UsartTrigger {
    fn trigger(&mut self) {
        self.irq.pend();
    }
}
