//! Embassy tasks

mod bus;
mod key;

pub use bus::bus_task;
pub use key::key_task;
