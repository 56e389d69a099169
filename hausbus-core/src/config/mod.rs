//! Node configuration
//!
//! Per-node parameters of the transport engine, optionally stored as
//! postcard binary data.

pub mod node;
#[cfg(feature = "serde")]
pub mod persist;

pub use node::*;
#[cfg(feature = "serde")]
pub use persist::MAX_STORED_SIZE;
