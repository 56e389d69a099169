//! USART2 interrupt
//!
//! One interrupt line serves reception, transmission and the kick from
//! `Bus::send`. The engine's interrupt-side handles are parked here once
//! the engine is split.

use core::cell::RefCell;

use embassy_stm32::gpio::Output;
use embassy_stm32::interrupt;
use embassy_stm32::interrupt::InterruptExt;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;
use hausbus_core::{Receiver, TxPump, RX_BUFFER_SIZE};
use hausbus_hal::TxEvent;
use hausbus_hal_stm32f0::{DePin, UsartRx, UsartTx};

use crate::channels::BUS_ACTIVITY;

pub type NodeReceiver = Receiver<'static, UsartRx, RX_BUFFER_SIZE>;
pub type NodePump = TxPump<'static, UsartTx, DePin<Output<'static>>>;

/// Handles owned by the interrupt
pub struct IrqHandles {
    pub receiver: NodeReceiver,
    pub pump: NodePump,
}

static HANDLES: Mutex<CriticalSectionRawMutex, RefCell<Option<IrqHandles>>> =
    Mutex::new(RefCell::new(None));

/// Park the handles and unmask USART2
pub fn install(handles: IrqHandles) {
    HANDLES.lock(|cell| *cell.borrow_mut() = Some(handles));
    // SAFETY: the handler only reaches shared state through HANDLES
    unsafe { interrupt::USART2.enable() };
}

#[interrupt]
fn USART2() {
    HANDLES.lock(|cell| {
        let mut handles = cell.borrow_mut();
        let Some(IrqHandles { receiver, pump }) = handles.as_mut() else {
            return;
        };

        let mut received = false;
        while let Some(event) = receiver.uart().read_event() {
            receiver.on_event(event);
            received = true;
        }
        if received {
            BUS_ACTIVITY.signal(());
        }

        // A pended interrupt carries no flag; a pending frame starts here
        pump.on_event(TxEvent::Kick);
        if let Some(event) = pump.uart().pending_event() {
            pump.on_event(event);
        }
    });
}
