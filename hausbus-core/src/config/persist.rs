//! Node identity persistence
//!
//! Nodes keep their [`NodeConfig`] in EEPROM or flash as postcard binary
//! data. Reading and writing the storage itself is the firmware's job; this
//! module only turns the configuration into bytes and back.

use super::node::{ConfigError, NodeConfig, NODE_CONFIG_VERSION};

/// Upper bound of a serialized [`NodeConfig`]
pub const MAX_STORED_SIZE: usize = 32;

impl NodeConfig {
    /// Serialize into `buffer`, returning the used prefix
    pub fn to_slice<'b>(&self, buffer: &'b mut [u8]) -> Result<&'b mut [u8], ConfigError> {
        postcard::to_slice(self, buffer).map_err(|_| ConfigError::Serialize)
    }

    /// Load and validate a stored configuration
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ConfigError> {
        let config: NodeConfig =
            postcard::from_bytes(bytes).map_err(|_| ConfigError::Deserialize)?;

        if config.version != NODE_CONFIG_VERSION {
            bus_warn!(
                "node config version mismatch: found {}, expected {}",
                config.version,
                NODE_CONFIG_VERSION
            );
            return Err(ConfigError::VersionMismatch);
        }

        config.validate()?;
        bus_debug!(
            "node config loaded: address {}, {} groups",
            config.address,
            config.groups.len()
        );
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_and_load() {
        let config = NodeConfig::pinpad(4).with_group(50).unwrap();
        let mut buffer = [0u8; MAX_STORED_SIZE];
        let stored = config.to_slice(&mut buffer).unwrap();
        assert_eq!(NodeConfig::from_bytes(stored), Ok(config));
    }

    #[test]
    fn test_old_version_rejected() {
        let config = NodeConfig {
            version: NODE_CONFIG_VERSION + 1,
            ..NodeConfig::new(4)
        };
        let mut buffer = [0u8; MAX_STORED_SIZE];
        let stored = config.to_slice(&mut buffer).unwrap();
        assert_eq!(
            NodeConfig::from_bytes(stored),
            Err(ConfigError::VersionMismatch)
        );
    }

    #[test]
    fn test_erased_storage_rejected() {
        // Erased flash reads back as 0xFF
        let erased = [0xFFu8; MAX_STORED_SIZE];
        assert!(NodeConfig::from_bytes(&erased).is_err());
    }

    #[test]
    fn test_buffer_too_small() {
        let mut buffer = [0u8; 2];
        assert_eq!(
            NodeConfig::busmaster().to_slice(&mut buffer),
            Err(ConfigError::Serialize)
        );
    }

    #[test]
    fn test_invalid_address_rejected_on_load() {
        let config = NodeConfig::new(0x80);
        let mut buffer = [0u8; MAX_STORED_SIZE];
        let stored = config.to_slice(&mut buffer).unwrap();
        assert_eq!(
            NodeConfig::from_bytes(stored),
            Err(ConfigError::InvalidAddress(0x80))
        );
    }
}
