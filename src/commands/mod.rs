//! Command handlers dispatched from `main.rs`. Each module corresponds to
//! one direction of the round trip: [`catalog`] only reads and reports,
//! [`unpack`] converts SSD -> directory, [`pack`] converts directory -> SSD.

pub mod catalog;
pub mod unpack;
pub mod pack;
