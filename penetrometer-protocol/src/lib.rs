//! Penetrometer link protocols
//!
//! The controller sits between three serial peers:
//!
//! ```text
//!   Robot ──ASCII lines──┐
//!                        ├── controller ──Modbus RTU── DCell (load cell)
//!   CNC   ──ASCII lines──┘
//! ```
//!
//! - Robot: `<tag><decimal>\n` requests, replies in the same shape, errors as
//!   `F<code><context>\n` and probe telemetry as `*<index>,<force>\n`.
//! - CNC: `<tag>X<decimal>\r\n` commands answered by a tagged line or a
//!   single-character error code.
//! - DCell: binary Modbus frames protected by CRC-16/Modbus, carrying force
//!   readings in a vendor floating point format.
//!
//! Everything here is pure and allocation free so it can be tested on host.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

pub mod checksum;
pub mod cnc;
pub mod dcell;
pub mod error;
pub mod force;
pub mod frame;
pub mod robot;

mod decimal;

pub use checksum::{append as append_crc, compute as crc16, verify as verify_crc};
pub use cnc::{CncCommand, CncErrorCode, CncReply, CncRequest};
pub use dcell::{DCellError, DCellFunction, DCellReply, DCellRequest};
pub use error::{EncodeError, ErrorCode, ErrorContext};
pub use force::{decode_force, RawForce};
pub use frame::{DCellAssembler, FrameStatus, LineAssembler};
pub use robot::{Command, RobotFrame, RobotRequest};

/// Maximum length of any ASCII line on the robot or CNC links
pub const MAX_LINE_LEN: usize = 64;
