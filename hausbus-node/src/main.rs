//! Hausbus node firmware
//!
//! Pinpad-class node on an STM32F042K6: USART2 drives the RS-485
//! transceiver (PA2=TX, PA3=RX, PA1=DE), PA0 is the key button.
//! The node only talks when the bus master polls it.

#![no_std]
#![no_main]

mod channels;
mod config;
mod irq;
mod tasks;

use defmt::*;
use embassy_executor::Spawner;
use embassy_stm32::bind_interrupts;
use embassy_stm32::exti::{self, ExtiInput};
use embassy_stm32::flash::Flash;
use embassy_stm32::gpio::{Level, Output, Pull, Speed};
use embassy_stm32::interrupt;
use embassy_stm32::usart::{self, Uart};
use embassy_time::{Duration, Ticker};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use hausbus_core::{bus_init, BusEngine};
use hausbus_hal_stm32f0::{DePin, MultidropUsart, UsartTrigger};

use crate::irq::IrqHandles;

bind_interrupts!(struct Irqs {
    EXTI0_1 => exti::InterruptHandler<embassy_stm32::interrupt::typelevel::EXTI0_1>;
});

/// Transport state, shared by the USART interrupt and the bus task
static ENGINE: StaticCell<BusEngine> = StaticCell::new();

/// Statistics dump interval
const STATS_INTERVAL_S: u64 = 60;

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Hausbus node starting...");

    let p = embassy_stm32::init(Default::default());

    let mut flash = Flash::new_blocking(p.FLASH);
    let node = config::load_identity(&mut flash);

    // Baud rate and word length are applied by bus_init
    let uart = unwrap!(Uart::new_blocking(
        p.USART2,
        p.PA3, // RX
        p.PA2, // TX
        usart::Config::default(),
    ));
    let mut usart = MultidropUsart::new(uart, embassy_stm32::pac::USART2);
    let mut de = DePin::new(Output::new(p.PA1, Level::Low, Speed::Low));

    if let Err(e) = bus_init(&mut usart, &mut de, &node) {
        defmt::panic!("Bus init failed: {:?}", e);
    }
    info!(
        "Bus up: address {}, {} baud, {} groups",
        node.address,
        node.baudrate,
        node.groups.len()
    );

    let (rx, tx) = usart.halves();
    let engine = ENGINE.init(BusEngine::new());
    let (bus, receiver, pump) = engine.split(
        node.clone(),
        rx,
        tx,
        de,
        UsartTrigger::new(interrupt::USART2),
    );
    irq::install(IrqHandles { receiver, pump });

    let key = ExtiInput::new(p.PA0, p.EXTI0, Pull::Up, Irqs);

    spawner.spawn(unwrap!(tasks::bus_task(bus, node.address)));
    spawner.spawn(unwrap!(tasks::key_task(key, node.address)));

    info!("All tasks spawned");

    // Never returns: `usart` owns the embassy driver the interrupt relies on
    let mut ticker = Ticker::every(Duration::from_secs(STATS_INTERVAL_S));
    loop {
        ticker.next().await;
        channels::STATS_REQUEST.signal(());
    }
}
