//! Bus poll task
//!
//! Woken by the USART interrupt; drains everything the receiver buffered.
//! Polls from the master are answered from the outbox, other frames are
//! logged and retired.

use defmt::*;
use embassy_futures::select::{select3, Either3};
use hausbus_core::{respond_to_poll, Bus, BusStatus, Outbox, RX_BUFFER_SIZE};
use hausbus_hal_stm32f0::UsartTrigger;
use hausbus_protocol::address::PINPAD_EVENTS_GROUP;
use hausbus_protocol::Frame;

use crate::channels::{BUS_ACTIVITY, KEY_CHANNEL, STATS_REQUEST};

pub type NodeBus = Bus<'static, RX_BUFFER_SIZE, UsartTrigger>;

/// Key event payload; the last byte is replaced by the key code
const KEY_EVENT: [u8; 5] = *b"KEY 0";

#[embassy_executor::task]
pub async fn bus_task(mut bus: NodeBus, address: u8) {
    info!("Bus task started");

    let mut outbox: Outbox = Outbox::new();

    loop {
        match select3(BUS_ACTIVITY.wait(), KEY_CHANNEL.receive(), STATS_REQUEST.wait()).await {
            Either3::First(()) => service(&mut bus, &mut outbox, address),
            Either3::Second(code) => queue_key(&mut outbox, address, code),
            Either3::Third(()) => log_stats(&bus, &outbox),
        }
    }
}

/// Work the receive ring until it has nothing complete left
fn service(bus: &mut NodeBus, outbox: &mut Outbox, address: u8) {
    loop {
        match bus.bus_status() {
            BusStatus::Idle => return,
            BusStatus::CompleteFrame => {
                if let Some(bytes) = bus.copy_frame() {
                    handle_frame(bus, outbox, &bytes, address);
                }
                bus.packet_done();
            }
            BusStatus::HeaderChecksumMismatch => {
                bus.skip_byte();
            }
            BusStatus::Faulted => {
                if let Some(kind) = bus.recover() {
                    warn!("Bus fault {:?}, receive buffer flushed", kind);
                }
            }
        }
    }
}

fn handle_frame(bus: &mut NodeBus, outbox: &mut Outbox, bytes: &[u8], address: u8) {
    let frame = match Frame::parse(bytes) {
        Ok(frame) => frame,
        Err(e) => {
            warn!("Unparseable frame: {:?}", e);
            return;
        }
    };

    match respond_to_poll(bus, outbox, &frame, address) {
        Ok(Some(poll)) => trace!("Answered {:?} from {}", poll, frame.source()),
        Ok(None) => info!(
            "Frame {} -> {}: {=[u8]:a}",
            frame.source(),
            frame.destination(),
            frame.payload
        ),
        Err(e) => warn!("Poll answer failed: {:?}", e),
    }
}

fn queue_key(outbox: &mut Outbox, address: u8, code: u8) {
    let mut payload = KEY_EVENT;
    payload[4] = b'0' + code % 10;
    match outbox.enqueue(PINPAD_EVENTS_GROUP, address, &payload) {
        Ok(()) => debug!("Key {} queued, {} pending", code, outbox.pending()),
        Err(e) => warn!("Key {} dropped: {:?}", code, e),
    }
}

fn log_stats(bus: &NodeBus, outbox: &Outbox) {
    let stats = bus.stats();
    info!(
        "Bus: {} frames in, {} out, {} faults, {} queued",
        stats.frames_completed,
        stats.frames_sent,
        stats.line_errors + stats.overflows + stats.truncated,
        outbox.pending()
    );
}
