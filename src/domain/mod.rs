//! Domain records, process state machines and the ports the rest of the crate
//! is written against.

pub mod booking;
pub mod payment;
pub mod ports;
pub mod process;
