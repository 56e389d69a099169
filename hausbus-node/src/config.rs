//! Node identity loading
//!
//! The identity (address, groups, baud rate, DE polarity) is provisioned
//! into the last flash page as a postcard record. Unprovisioned boards
//! (erased flash) come up with the pinpad preset.

use defmt::*;
use embassy_stm32::flash::{Blocking, Flash};
use hausbus_core::config::MAX_STORED_SIZE;
use hausbus_core::NodeConfig;

/// Last 1 KiB page of the F042's 32 KiB flash
const IDENTITY_OFFSET: u32 = 0x7C00;

/// Address used by unprovisioned boards
const FALLBACK_ADDRESS: u8 = 29;

/// Load the node identity, falling back to defaults on any error
pub fn load_identity(flash: &mut Flash<'_, Blocking>) -> NodeConfig {
    let mut record = [0u8; MAX_STORED_SIZE];
    if let Err(e) = flash.blocking_read(IDENTITY_OFFSET, &mut record) {
        warn!("Identity read failed: {:?}, using defaults", e);
        return fallback();
    }

    match NodeConfig::from_bytes(&record) {
        Ok(node) => {
            info!("Identity loaded from flash");
            node
        }
        Err(e) => {
            warn!("No stored identity ({:?}), using defaults", e);
            fallback()
        }
    }
}

fn fallback() -> NodeConfig {
    NodeConfig::pinpad(FALLBACK_ADDRESS)
}
