//! Per-node parameters
//!
//! Every station runs the same engine. What differs between the bus master,
//! a pinpad and a temperature node is captured here.

use heapless::Vec;
use hausbus_hal::UartConfig;
use hausbus_protocol::address::{self, AddressKind};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Current node configuration format version
pub const NODE_CONFIG_VERSION: u8 = 1;

/// Maximum group memberships per node
pub const MAX_GROUPS: usize = 4;

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Own address is a group, broadcast or reserved address
    InvalidAddress(u8),
    /// Group membership outside the group range
    InvalidGroup(u8),
    /// Too many group memberships
    TooManyGroups,
    /// Baud rate of zero
    InvalidBaudrate,
    /// Stored configuration was written by another format version
    VersionMismatch,
    /// Output buffer too small for the serialized configuration
    Serialize,
    /// Stored bytes are not a configuration
    Deserialize,
}

/// Identity and link parameters of one node
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeConfig {
    /// Configuration format version
    pub version: u8,
    /// Own bus address
    pub address: u8,
    /// Group addresses this node listens to
    pub groups: Vec<u8, MAX_GROUPS>,
    /// Accept frames for every address (bus master)
    pub promiscuous: bool,
    /// Line speed in bits per second
    pub baudrate: u32,
    /// Transceiver driver enable is asserted by driving the pin low
    pub de_active_low: bool,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self::busmaster()
    }
}

impl NodeConfig {
    /// Node with no group memberships at the default line speed
    pub fn new(address: u8) -> Self {
        Self {
            version: NODE_CONFIG_VERSION,
            address,
            groups: Vec::new(),
            promiscuous: false,
            baudrate: hausbus_hal::uart::DEFAULT_BAUDRATE,
            de_active_low: false,
        }
    }

    /// Gateway between Ethernet and the bus; sees every frame
    pub fn busmaster() -> Self {
        Self {
            promiscuous: true,
            ..Self::new(address::MASTER)
        }
    }

    /// Keypad node
    pub fn pinpad(address: u8) -> Self {
        Self::new(address)
    }

    /// Temperature sensor node
    pub fn temperature(address: u8) -> Self {
        Self::new(address)
    }

    /// Add a group membership
    pub fn with_group(mut self, group: u8) -> Result<Self, ConfigError> {
        if !address::GROUPS.contains(&group) {
            return Err(ConfigError::InvalidGroup(group));
        }
        if !self.groups.contains(&group) {
            self.groups
                .push(group)
                .map_err(|_| ConfigError::TooManyGroups)?;
        }
        Ok(self)
    }

    /// Whether a frame for `destination` is meant for this node
    pub fn accepts(&self, destination: u8) -> bool {
        self.promiscuous
            || destination == self.address
            || destination == address::BROADCAST
            || self.groups.contains(&destination)
    }

    /// UART settings for this node
    pub fn uart_config(&self) -> UartConfig {
        UartConfig::multidrop(self.baudrate)
    }

    /// Check the configuration against the address plan
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.version != NODE_CONFIG_VERSION {
            return Err(ConfigError::VersionMismatch);
        }
        if !AddressKind::is_assignable(self.address) {
            return Err(ConfigError::InvalidAddress(self.address));
        }
        if let Some(&group) = self
            .groups
            .iter()
            .find(|g| !address::GROUPS.contains(g))
        {
            return Err(ConfigError::InvalidGroup(group));
        }
        if self.baudrate == 0 {
            return Err(ConfigError::InvalidBaudrate);
        }
        Ok(())
    }
}
