//! Robot (operator) line protocol
//!
//! Requests are `<tag><decimal>\n`. Lowercase tags set a value, uppercase tags
//! read one; a handful of symbols trigger actions. Replies reuse the
//! uppercase tag with the resulting value.

use heapless::Vec;

use crate::decimal;
use crate::error::{EncodeError, ErrorCode, ErrorContext};
use crate::frame::LINE_END;
use crate::MAX_LINE_LEN;

/// Tag of unsolicited probe telemetry
pub const DATA_TAG: u8 = b'*';

/// Separator between sample index and force in telemetry
pub const DATA_SEPARATOR: u8 = b',';

/// Tag of diagnostic log lines
pub const LOG_TAG: u8 = b'#';

/// Outbound robot frame
pub type RobotFrame = Vec<u8, MAX_LINE_LEN>;

/// Commands the controller accepts from the robot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum Command {
    /// Ping; also cancels the running task
    None = b' ',
    Init = b'@',
    Done = b'~',
    Save = b'^',
    Log = b'#',
    DoProbe = b'!',
    DoRefHome = b'z',

    SetEStop = b'e',
    SetGroundLevel = b'g',
    SetTopSpeed = b't',
    SetSpeed = b's',
    SetHomeSpeed = b'k',
    SetAccel = b'a',
    SetDecel = b'd',
    SetProbeDepth = b'l',
    SetStepsPerX = b'q',
    SetLfdTolerance = b'r',
    SetEnable = b'p',
    SetMaxForce = b'm',
    SetMinForce = b'n',
    SetMaxForceDelta = b'x',
    SetMinForceDelta = b'y',
    SetForceDeltaAbs = b'v',
    SetSafeDisconnect = b'o',
    ClearError = b'f',
    CncPassthrough = b'b',
    DCellPassthrough = b'c',

    IsRefHomed = b'Z',
    GetEStop = b'E',
    GetGroundLevel = b'G',
    GetTopSpeed = b'T',
    GetSpeed = b'S',
    GetHomeSpeed = b'K',
    GetAccel = b'A',
    GetDecel = b'D',
    GetProbeDepth = b'L',
    GetForce = b'W',
    GetStepsPerX = b'Q',
    GetLfdTolerance = b'R',
    GetEnable = b'P',
    GetMaxForce = b'M',
    GetMinForce = b'N',
    GetMaxForceDelta = b'X',
    GetMinForceDelta = b'Y',
    GetForceDeltaAbs = b'V',
    GetSafeDisconnect = b'O',
    GetHomeState = b'H',
    GetLfdState = b'U',
    GetProbeState = b'J',
    GetError = b'F',
}

impl Command {
    pub fn from_byte(byte: u8) -> Option<Self> {
        use Command::*;
        Some(match byte {
            b' ' => None,
            b'@' => Init,
            b'~' => Done,
            b'^' => Save,
            b'#' => Log,
            b'!' => DoProbe,
            b'z' => DoRefHome,
            b'e' => SetEStop,
            b'g' => SetGroundLevel,
            b't' => SetTopSpeed,
            b's' => SetSpeed,
            b'k' => SetHomeSpeed,
            b'a' => SetAccel,
            b'd' => SetDecel,
            b'l' => SetProbeDepth,
            b'q' => SetStepsPerX,
            b'r' => SetLfdTolerance,
            b'p' => SetEnable,
            b'm' => SetMaxForce,
            b'n' => SetMinForce,
            b'x' => SetMaxForceDelta,
            b'y' => SetMinForceDelta,
            b'v' => SetForceDeltaAbs,
            b'o' => SetSafeDisconnect,
            b'f' => ClearError,
            b'b' => CncPassthrough,
            b'c' => DCellPassthrough,
            b'Z' => IsRefHomed,
            b'E' => GetEStop,
            b'G' => GetGroundLevel,
            b'T' => GetTopSpeed,
            b'S' => GetSpeed,
            b'K' => GetHomeSpeed,
            b'A' => GetAccel,
            b'D' => GetDecel,
            b'L' => GetProbeDepth,
            b'W' => GetForce,
            b'Q' => GetStepsPerX,
            b'R' => GetLfdTolerance,
            b'P' => GetEnable,
            b'M' => GetMaxForce,
            b'N' => GetMinForce,
            b'X' => GetMaxForceDelta,
            b'Y' => GetMinForceDelta,
            b'V' => GetForceDeltaAbs,
            b'O' => GetSafeDisconnect,
            b'H' => GetHomeState,
            b'U' => GetLfdState,
            b'J' => GetProbeState,
            b'F' => GetError,
            _ => return Option::None,
        })
    }

    pub fn tag(self) -> u8 {
        self as u8
    }

    /// Tag used when replying to this command
    ///
    /// Setters answer with their getter's tag.
    pub fn reply_tag(self) -> u8 {
        self.tag().to_ascii_uppercase()
    }
}

/// A decoded robot line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RobotRequest {
    /// Raw tag byte, kept for error contexts when unrecognised
    pub tag: u8,
    pub parameter: i32,
}

impl RobotRequest {
    /// Parse a line with its terminator removed
    ///
    /// An empty line is treated as a ping.
    pub fn parse(line: &[u8]) -> Self {
        match line.split_first() {
            Some((&tag, rest)) => Self {
                tag,
                parameter: decimal::parse(rest),
            },
            None => Self {
                tag: Command::None.tag(),
                parameter: 0,
            },
        }
    }

    pub fn command(&self) -> Option<Command> {
        Command::from_byte(self.tag)
    }
}

fn finish(mut frame: RobotFrame) -> Result<RobotFrame, EncodeError> {
    frame
        .push(LINE_END)
        .map_err(|_| EncodeError::BufferTooSmall)?;
    Ok(frame)
}

fn start(bytes: &[u8]) -> Result<RobotFrame, EncodeError> {
    let mut frame = RobotFrame::new();
    frame
        .extend_from_slice(bytes)
        .map_err(|_| EncodeError::BufferTooSmall)?;
    Ok(frame)
}

/// `<tag><value>\n`
pub fn encode_reply(tag: u8, value: i32) -> Result<RobotFrame, EncodeError> {
    let mut frame = start(&[tag])?;
    decimal::push(&mut frame, value)?;
    finish(frame)
}

/// `F<code><context>\n`
pub fn encode_error(code: ErrorCode, context: ErrorContext) -> Result<RobotFrame, EncodeError> {
    finish(start(&[Command::GetError.tag(), code.to_wire(), context.0])?)
}

/// Reply to a ping
pub fn encode_ping() -> Result<RobotFrame, EncodeError> {
    finish(start(&[Command::None.tag()])?)
}

/// `*<index>,<force>\n`
pub fn encode_sample(index: i32, force: i32) -> Result<RobotFrame, EncodeError> {
    let mut frame = start(&[DATA_TAG])?;
    decimal::push(&mut frame, index)?;
    frame
        .push(DATA_SEPARATOR)
        .map_err(|_| EncodeError::BufferTooSmall)?;
    decimal::push(&mut frame, force)?;
    finish(frame)
}

/// `# <text>\n`; text longer than a line is truncated
pub fn encode_log(parts: &[&[u8]]) -> RobotFrame {
    let mut frame = RobotFrame::new();
    let body = MAX_LINE_LEN - 1;
    for &byte in [&[LOG_TAG, b' '][..]]
        .iter()
        .chain(parts.iter())
        .flat_map(|part| part.iter())
    {
        if frame.len() == body {
            break;
        }
        // Embedded line ends would split the log line
        let byte = if byte == b'\r' || byte == LINE_END {
            b' '
        } else {
            byte
        };
        let _ = frame.push(byte);
    }
    let _ = frame.push(LINE_END);
    frame
}
