//! Hausbus wire protocol
//!
//! This crate defines the frame format spoken by every node on the RS-485
//! bus. It is pure data handling with no state and no hardware access, so
//! the same code builds the frames on the nodes and decodes them in host
//! tools.
//!
//! # Frame Overview
//!
//! ```text
//! ┌──────┬──────┬────────────┬─────────────┬────────┬────────┬───────────┐
//! │ DEST │ SRC  │ HEADER CHK │ PAYLOAD CHK │ LEN HI │ LEN LO │ PAYLOAD   │
//! │ 1B   │ 1B   │ 1B         │ 1B (0xFF)   │ 1B     │ 1B     │ LEN bytes │
//! └──────┴──────┴────────────┴─────────────┴────────┴────────┴───────────┘
//! ```
//!
//! The destination byte is sent with the 9th UART bit set so that nodes in
//! address-filtering mode only wake up for frames that concern them.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
#[macro_use]
extern crate std;

pub mod address;
pub mod frame;
pub mod messages;

pub use address::AddressKind;
pub use frame::{
    encode_frame, encode_to_vec, validate_header, Frame, FrameBuf, FrameError, Header,
    HEADER_SIZE, MAX_FRAME_SIZE, MAX_PAYLOAD_SIZE, PAYLOAD_CHECKSUM_RESERVED,
};
pub use messages::PollMessage;
