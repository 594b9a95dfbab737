//! Board definition
//!
//! Pin assignments for the penetrometer carrier board and the [`Board`]
//! binding that ties the controller to its RP2040 peripherals.

use penetrometer_core::Board;
use penetrometer_hal_rp2040::{BoardIo, PipeLink};

/// Robot UART TX/RX
pub const ROBOT_PINS: (u8, u8) = (0, 1);
/// CNC UART TX/RX
pub const CNC_PINS: (u8, u8) = (4, 5);
/// DCell PIO UART TX/RX
pub const DCELL_PINS: (u8, u8) = (6, 7);

/// Step pulse from the CNC, one per motor step
pub const STEP_PULSE_PIN: u8 = 10;
/// CNC motion in progress, active high
pub const MOVING_PIN: u8 = 11;
/// Limit force detector, active high
pub const LFD_PIN: u8 = 12;
/// Estop chain sense, active low
pub const ESTOP_SENSE_PIN: u8 = 13;
/// Estop chain driver, high pulls the chain active
pub const ESTOP_DRIVE_PIN: u8 = 14;

/// The penetrometer carrier board
pub struct Penetrometer;

impl Board for Penetrometer {
    type Robot = PipeLink;
    type Cnc = PipeLink;
    type DCell = PipeLink;
    type Machine = BoardIo;
}
