//! DCell load-cell amplifier: Modbus RTU requests and responses
//!
//! Requests always address two consecutive 16-bit registers:
//!
//! ```text
//! read:  station 0x03 regHi regLo 0x00 0x02 crcLo crcHi                    (8)
//! write: station 0x10 regHi regLo 0x00 0x02 0x04 d0 d1 d2 d3 crcLo crcHi   (13)
//! ```

use crate::checksum;
use crate::force::RawForce;

/// Modbus station the controller talks to
pub const STATION_NUMBER: u8 = 1;

/// Calibrated reading register
pub const REG_FORCE: u16 = 30;

/// Station number register
pub const REG_STATION: u16 = 66;

/// Read request length
pub const READ_REQUEST_LEN: usize = 8;

/// Write request length
pub const WRITE_REQUEST_LEN: usize = 13;

/// Function code that ends a robot-driven passthrough session
pub const PASSTHROUGH_EXIT: u8 = 0x2A;

/// Function codes seen on the DCell link
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum DCellFunction {
    ReadRegisters = 0x03,
    WriteRegisters = 0x10,
    ReadException = 0x83,
    WriteException = 0x90,
}

impl DCellFunction {
    pub fn from_byte(byte: u8) -> Option<Self> {
        match byte {
            0x03 => Some(Self::ReadRegisters),
            0x10 => Some(Self::WriteRegisters),
            0x83 => Some(Self::ReadException),
            0x90 => Some(Self::WriteException),
            _ => None,
        }
    }

    /// Length of the response frame carrying this function code
    pub fn response_len(self) -> usize {
        match self {
            Self::ReadRegisters => 9,
            Self::WriteRegisters => 8,
            Self::ReadException | Self::WriteException => 5,
        }
    }

    pub fn is_exception(self) -> bool {
        matches!(self, Self::ReadException | Self::WriteException)
    }
}

/// Length of a request frame the robot relays through the controller
///
/// `None` for function codes the controller refuses to relay.
pub fn request_len(function: u8) -> Option<usize> {
    match function {
        0x03 => Some(READ_REQUEST_LEN),
        0x10 => Some(WRITE_REQUEST_LEN),
        0x83 | 0x90 | PASSTHROUGH_EXIT => Some(5),
        _ => None,
    }
}

/// Outbound DCell request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DCellRequest {
    /// Read two registers starting at `register`
    Read { register: u16 },
    /// Write two registers starting at `register`
    Write { register: u16, lower: u16, upper: u16 },
}

impl DCellRequest {
    /// The force sample request
    pub const fn force() -> Self {
        Self::Read { register: REG_FORCE }
    }

    /// The station-number probe used to check the link at init
    pub const fn station() -> Self {
        Self::Read { register: REG_STATION }
    }

    /// Encode including CRC; returns the number of bytes used
    pub fn encode(&self, out: &mut [u8; WRITE_REQUEST_LEN]) -> usize {
        let len = match *self {
            Self::Read { register } => {
                out[..6].copy_from_slice(&[
                    STATION_NUMBER,
                    DCellFunction::ReadRegisters as u8,
                    (register >> 8) as u8,
                    register as u8,
                    0,
                    2,
                ]);
                READ_REQUEST_LEN
            }
            Self::Write {
                register,
                lower,
                upper,
            } => {
                out[..11].copy_from_slice(&[
                    STATION_NUMBER,
                    DCellFunction::WriteRegisters as u8,
                    (register >> 8) as u8,
                    register as u8,
                    0,
                    2,
                    4,
                    (lower >> 8) as u8,
                    lower as u8,
                    (upper >> 8) as u8,
                    upper as u8,
                ]);
                WRITE_REQUEST_LEN
            }
        };
        checksum::append(&mut out[..len]);
        len
    }
}

/// A checked DCell response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DCellReply {
    /// Register read; the four data bytes
    Registers(RawForce),
    /// Write acknowledged
    Written,
    /// Peer reported an exception code
    Exception(u8),
}

/// Reasons a complete DCell frame is rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DCellError {
    BadChecksum,
    BadFunction,
}

impl DCellReply {
    /// Validate and classify a complete response frame
    pub fn parse(frame: &[u8]) -> Result<Self, DCellError> {
        if !checksum::verify(frame) {
            return Err(DCellError::BadChecksum);
        }
        let function = frame
            .get(1)
            .copied()
            .and_then(DCellFunction::from_byte)
            .ok_or(DCellError::BadFunction)?;

        match function {
            DCellFunction::ReadRegisters => RawForce::from_response(frame)
                .map(Self::Registers)
                .ok_or(DCellError::BadFunction),
            DCellFunction::WriteRegisters => Ok(Self::Written),
            DCellFunction::ReadException | DCellFunction::WriteException => {
                Ok(Self::Exception(frame.get(2).copied().unwrap_or(0)))
            }
        }
    }
}
