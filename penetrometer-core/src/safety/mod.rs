//! Safety supervision
//!
//! [`SharedSafetyState`] is the interrupt-facing half; [`Supervisor`] runs in
//! the control loop and turns what the interrupts observed into faults.

pub mod shared;
pub mod supervisor;

pub use shared::SharedSafetyState;
pub use supervisor::{SafetyEvent, SafetyStatus, SampleVerdict, Supervisor};
