//! STM32F0 support for Hausbus nodes
//!
//! Implements the `hausbus-hal` traits on top of embassy-stm32:
//!
//! - [`uart::MultidropUsart`] - 9-bit USART set up through embassy, then
//!   driven register by register from the USART interrupt
//! - [`gpio::DePin`] - RS-485 driver-enable line from any embedded-hal pin
//!
//! # Features
//!
//! - `stm32f042f6` / `stm32f042k6` - Chip selection
//! - `defmt` - Enable debug formatting support
//!
//! # Interrupt wiring
//!
//! The USART has a single interrupt line. The firmware owns the handler and
//! calls [`uart::UsartRx::read_event`] and [`uart::UsartTx::pending_event`]
//! from it; [`uart::UsartTrigger`] pends the same line so the transmit pump
//! can start a frame.

#![no_std]

pub mod gpio;
pub mod uart;

pub use gpio::DePin;
pub use uart::{MultidropUsart, UsartRx, UsartTrigger, UsartTx};
