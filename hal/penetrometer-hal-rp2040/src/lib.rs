//! RP2040 board support for the penetrometer controller
//!
//! This crate provides RP2040-specific implementations of the
//! `penetrometer-core` hardware traits:
//!
//! - [`link::PipeLink`]: a non-blocking `ByteLink` fed by an async UART pump
//! - [`gpio::BoardIo`]: `MachineIo` over the moving and estop lines
//! - UART pin mapping checks for board bring-up

#![no_std]

pub mod gpio;
pub mod link;
pub mod uart;

pub use gpio::{BoardIo, EstopSense};
pub use link::{LinkBuffers, LinkFault, PipeLink};
pub use uart::UartId;
