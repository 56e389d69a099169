//! Bus address plan
//!
//! One byte addresses every station on the bus:
//!
//! | Range       | Meaning                                          |
//! |-------------|--------------------------------------------------|
//! | `0x00`      | Bus master (Ethernet gateway)                    |
//! | `1..=29`    | Individual nodes                                 |
//! | `50..=100`  | Groups, joined by nodes and IPv6 multicast peers |
//! | `0xFF`      | Broadcast                                        |
//!
//! The gateway also uses `0xFF` as the *source* of frames it bridges from
//! Ethernet, since those have no bus-side sender.

use core::ops::RangeInclusive;

/// Address of the bus master
pub const MASTER: u8 = 0x00;

/// Destination that every node accepts
pub const BROADCAST: u8 = 0xFF;

/// Source address used for frames bridged from the network
pub const BRIDGE_SOURCE: u8 = 0xFF;

/// Addresses assignable to individual nodes
pub const NODES: RangeInclusive<u8> = 1..=29;

/// Group addresses
pub const GROUPS: RangeInclusive<u8> = 50..=100;

/// Group the pinpad reports its events to
pub const PINPAD_EVENTS_GROUP: u8 = 50;

/// Classification of a bus address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum AddressKind {
    /// The bus master
    Master,
    /// A single node
    Node(u8),
    /// A group of nodes
    Group(u8),
    /// Every node
    Broadcast,
    /// Outside the address plan
    Reserved(u8),
}

impl AddressKind {
    /// Classify a raw address byte
    pub fn classify(address: u8) -> Self {
        match address {
            MASTER => AddressKind::Master,
            BROADCAST => AddressKind::Broadcast,
            a if NODES.contains(&a) => AddressKind::Node(a),
            a if GROUPS.contains(&a) => AddressKind::Group(a),
            a => AddressKind::Reserved(a),
        }
    }

    /// Whether a node may use this as its own address
    pub fn is_assignable(address: u8) -> bool {
        matches!(
            Self::classify(address),
            AddressKind::Master | AddressKind::Node(_)
        )
    }
}
