//! Inter-task signalling
//!
//! The USART interrupt wakes the bus task; the key task hands key codes to
//! the bus task, which owns the outbox.

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel;
use embassy_sync::signal::Signal;

/// Capacity for key presses not yet queued for the master
const KEY_CHANNEL_SIZE: usize = 4;

/// Raised by the USART interrupt after receive activity
pub static BUS_ACTIVITY: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Ask the bus task to log its statistics
pub static STATS_REQUEST: Signal<CriticalSectionRawMutex, ()> = Signal::new();

/// Key codes from the key task
pub static KEY_CHANNEL: Channel<CriticalSectionRawMutex, u8, KEY_CHANNEL_SIZE> = Channel::new();
