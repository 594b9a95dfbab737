//! Board-agnostic logic for the penetrometer controller
//!
//! The controller mediates between the Robot, the CNC motion controller and
//! the DCell load cell. This crate holds everything that does not touch
//! hardware directly:
//!
//! - Link and machine traits implemented by the board HAL
//! - Peer sessions (request/reply with timeouts)
//! - Command dispatch and the per-command task state machines
//! - Safety supervision (estop latch, force limits, LFD, watchdog)
//! - Configuration type definitions
//!
//! [`controller::Controller::poll`] is the single cooperative loop body;
//! interrupt handlers talk to it only through
//! [`safety::SharedSafetyState`].

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod config;
pub mod controller;
pub mod dispatcher;
pub mod mirror;
pub mod safety;
pub mod session;
pub mod task;
pub mod traits;

#[cfg(test)]
pub(crate) mod testing;

pub use controller::Controller;
pub use traits::{Board, ByteLink, LinkError, MachineIo};
