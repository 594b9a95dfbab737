//! Hardware abstraction traits
//!
//! These traits are implemented by the board HAL and consumed by the
//! controller. Keeping them here lets the whole controller run against
//! in-memory doubles on the host.

pub mod link;
pub mod machine;

pub use link::{ByteLink, LinkError};
pub use machine::MachineIo;

/// The set of concrete peripherals a controller is built from
pub trait Board {
    type Robot: ByteLink;
    type Cnc: ByteLink;
    type DCell: ByteLink;
    type Machine: MachineIo;
}
