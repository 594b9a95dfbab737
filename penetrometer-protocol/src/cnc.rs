//! CNC motion controller line protocol
//!
//! Commands are single ASCII letters followed by the axis selector `X` and an
//! optional decimal value, terminated by CR LF. Setters are lowercase and are
//! acknowledged with the uppercase letter; getters are uppercase and answered
//! with the same letter. Every reply carries its value from byte 2 on.
//!
//! A reply consisting of one of `/01234567` is an error code instead.

use heapless::Vec;

use crate::decimal;
use crate::error::EncodeError;
use crate::MAX_LINE_LEN;

/// Line ending sent with every command
pub const LINE_END: &[u8] = b"\r\n";

/// Axis selector used by the single-axis penetrometer
pub const AXIS: u8 = b'X';

/// Home/limit switch states reported by `H`
pub mod home_state {
    pub const MID_ZONE: i32 = 0;
    pub const MIN_ZONE: i32 = 1;
    pub const MAX_ZONE: i32 = 2;
    pub const MOVING_OFF: i32 = 3;
    pub const HOMING: i32 = 4;
    pub const HOMED: i32 = 5;
    pub const MIN_LIMIT: i32 = 6;
    pub const MAX_LIMIT: i32 = 7;

    /// True when a travel limit switch is engaged
    pub fn at_limit(state: i32) -> bool {
        state == MIN_LIMIT || state == MAX_LIMIT
    }
}

/// CNC command letters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CncCommand {
    Init = b'@',
    Done = b'~',
    SaveParams = b'^',
    SetEStop = b'e',
    GetEStop = b'E',
    GoTo = b'g',
    RefHome = b'z',
    SetTopSpeed = b't',
    SetSpeed = b's',
    SetHomeSpeed = b'k',
    SetAccel = b'a',
    SetDecel = b'd',
    SetStepsPerX = b'q',
    SetEnable = b'p',
    GetTargetPos = b'G',
    GetHomeState = b'H',
    GetTopSpeed = b'T',
    GetSpeed = b'S',
    GetHomeSpeed = b'K',
    GetAccel = b'A',
    GetDecel = b'D',
    GetPosMin = b'L',
    GetPosMax = b'U',
    GetStepsPerX = b'Q',
    GetFault = b'F',
    GetEnable = b'P',
    GetAccelMax = b'Y',
    GetSpeedMax = b'M',
    IsRefHomed = b'Z',
}

impl CncCommand {
    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Tag of the reply that acknowledges this command
    pub fn expected_reply(self) -> u8 {
        self.tag().to_ascii_uppercase()
    }

    /// Commands carrying a decimal value after the axis selector
    pub fn takes_value(self) -> bool {
        matches!(
            self,
            Self::GoTo
                | Self::SetTopSpeed
                | Self::SetSpeed
                | Self::SetHomeSpeed
                | Self::SetAccel
                | Self::SetDecel
                | Self::SetStepsPerX
                | Self::SetEnable
        )
    }
}

/// A command ready to transmit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CncRequest {
    pub command: CncCommand,
    pub value: i32,
}

impl CncRequest {
    pub const fn new(command: CncCommand, value: i32) -> Self {
        Self { command, value }
    }

    /// A command without a value
    pub const fn get(command: CncCommand) -> Self {
        Self { command, value: 0 }
    }

    pub fn expected_reply(&self) -> u8 {
        self.command.expected_reply()
    }

    /// Render the full line including CR LF
    pub fn encode(&self) -> Result<Vec<u8, MAX_LINE_LEN>, EncodeError> {
        fn put(bytes: &[u8], out: &mut Vec<u8, MAX_LINE_LEN>) -> Result<(), EncodeError> {
            out.extend_from_slice(bytes)
                .map_err(|_| EncodeError::BufferTooSmall)
        }

        let mut out = Vec::new();
        put(&[self.command.tag()], &mut out)?;
        match self.command {
            CncCommand::Init => put(b"CNC", &mut out)?,
            CncCommand::Done | CncCommand::SaveParams | CncCommand::GetEStop => {
                put(b" ", &mut out)?
            }
            CncCommand::SetEStop => {
                put(if self.value != 0 { b"1" } else { b"0" }, &mut out)?
            }
            command => {
                put(&[AXIS], &mut out)?;
                if command.takes_value() {
                    decimal::push(&mut out, self.value)?;
                }
            }
        }
        put(LINE_END, &mut out)?;
        Ok(out)
    }
}

/// Error codes the CNC sends in place of a reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum CncErrorCode {
    /// Value was clamped to a limit
    Constrained = b'/',
    None = b'0',
    Axis = b'1',
    Parameter = b'2',
    Command = b'3',
    Eeprom = b'4',
    Hardware = b'5',
    State = b'6',
    Comms = b'7',
}

impl CncErrorCode {
    pub fn from_byte(byte: u8) -> Option<Self> {
        Some(match byte {
            b'/' => Self::Constrained,
            b'0' => Self::None,
            b'1' => Self::Axis,
            b'2' => Self::Parameter,
            b'3' => Self::Command,
            b'4' => Self::Eeprom,
            b'5' => Self::Hardware,
            b'6' => Self::State,
            b'7' => Self::Comms,
            _ => return None,
        })
    }

    /// The CNC refused the request but the link and axis are sound
    pub fn is_rejection(self) -> bool {
        matches!(self, Self::Parameter | Self::State)
    }

    /// Answers the pending request; anything else is a fault
    pub fn answers_request(self) -> bool {
        matches!(self, Self::Constrained | Self::None) || self.is_rejection()
    }
}

/// A received CNC line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct CncReply {
    pub tag: u8,
    pub value: i32,
}

impl CncReply {
    /// Split a line (terminator already removed) into tag and value
    pub fn parse(line: &[u8]) -> Option<Self> {
        let tag = *line.first()?;
        let value = line.get(2..).map(decimal::parse).unwrap_or(0);
        Some(Self { tag, value })
    }

    pub fn error_code(&self) -> Option<CncErrorCode> {
        CncErrorCode::from_byte(self.tag)
    }
}
