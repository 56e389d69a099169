//! Board-agnostic transport engine for Hausbus nodes
//!
//! This crate contains everything between the UART and the application that
//! does not depend on a specific chip:
//!
//! - Lock-free receive ring shared by the receive interrupt and the poll loop
//! - Address filtering and frame tracking in interrupt context
//! - Frame detection and resynchronisation on the poll side
//! - Interrupt-driven transmit pump with driver-enable control
//! - Outgoing frame queue and master poll responder
//! - Node configuration
//!
//! # Contexts
//!
//! ```text
//!   USART RX IRQ            poll loop              USART TX IRQ
//!  ┌────────────┐  ring   ┌──────────┐  tx slot  ┌────────────┐
//!  │  Receiver  │ ──────▶ │   Bus    │ ────────▶ │   TxPump   │
//!  └────────────┘  fault  └──────────┘  trigger  └────────────┘
//! ```

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate std;

#[macro_use]
mod log;

pub mod config;
pub mod detector;
pub mod engine;
pub mod fault;
pub mod outbox;
pub mod receiver;
pub mod ring;
pub mod service;
pub mod stats;
pub mod transmit;

pub use config::{ConfigError, NodeConfig};
pub use detector::BusStatus;
pub use engine::{bus_init, Bus, BusEngine, RX_BUFFER_SIZE};
pub use fault::FaultKind;
pub use outbox::{Outbox, OutboxError};
pub use receiver::Receiver;
pub use ring::{Overflow, RingBuffer};
pub use service::respond_to_poll;
pub use stats::BusStats;
pub use transmit::{SendError, TxPhase, TxPump};
