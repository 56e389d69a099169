//! Hausbus Hardware Abstraction Layer
//!
//! This crate defines the capabilities the bus transport engine needs from
//! a platform: a UART with a 9th "address/data" marker bit and a
//! driver-enable output for the half-duplex RS-485 transceiver. Chip
//! specific crates implement these traits; the engine never touches
//! registers directly.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  hausbus-core (engine) / hausbus-node   │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  hausbus-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │ hausbus-hal-  │       │  mock (host   │
//! │   stm32f0     │       │   tests)      │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`gpio::OutputPin`] - Driver-enable line
//! - [`uart::MultidropRx`], [`uart::MultidropTx`] - Interrupt-side UART halves
//! - [`uart::MultidropUart`] - One-time peripheral setup
//! - [`uart::TxTrigger`] - Poll-side kick of the transmit interrupt

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
#[cfg(feature = "mock")]
pub mod mock;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use gpio::OutputPin;
pub use uart::{
    MultidropRx, MultidropTx, MultidropUart, RxError, RxEvent, TxEvent, TxInterrupt, TxTrigger,
    UartConfig,
};
