//! Key button task
//!
//! Debounces the key input and hands a key code to the bus task. Nodes may
//! not talk unprompted, so the event waits in the outbox for the master's
//! next `send`.

use defmt::*;
use embassy_stm32::exti::ExtiInput;
use embassy_time::{Duration, Timer};

use crate::channels::KEY_CHANNEL;

/// Settle time after an edge
const DEBOUNCE_MS: u64 = 20;

/// Code reported for the single key of this board
const KEY_CODE: u8 = 1;

#[embassy_executor::task]
pub async fn key_task(mut key: ExtiInput<'static>, address: u8) {
    info!("Key task started (node {})", address);

    loop {
        key.wait_for_falling_edge().await;
        Timer::after(Duration::from_millis(DEBOUNCE_MS)).await;
        if key.is_high() {
            continue;
        }

        if KEY_CHANNEL.try_send(KEY_CODE).is_err() {
            warn!("Key event dropped, channel full");
        }
        key.wait_for_rising_edge().await;
    }
}
