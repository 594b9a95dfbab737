//! Error codes and contexts reported to the robot
//!
//! An error travels as `F<code><context>\n` where `code` is `'0' + n` and
//! `context` names the subsystem (or the offending command tag).

/// Error code reported in the `F` reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum ErrorCode {
    #[default]
    None = 0,
    /// Emergency stop asserted
    Estop = 1,
    /// Command tag not recognised
    Unrecognised = 2,
    /// Command arrived while another was running
    Busy = 3,
    /// Peer refused the command in its current state
    WrongState = 4,
    /// Parameter out of range
    BadParameter = 5,
    /// Force, force delta or limit switch tripped
    LimitExceeded = 6,
    /// Motion controller reported a hardware fault
    HardwareFault = 7,
    /// Motion controller reported a persistent storage failure
    HardwareFailure = 8,
    /// Peer silent, malformed or failed checksum
    NoComms = 9,
    /// Unclassified peer failure
    Unknown = 10,
}

impl ErrorCode {
    /// Character sent on the wire (`'0' + code`)
    pub fn to_wire(self) -> u8 {
        b'0' + self as u8
    }

    /// Decode the wire character
    pub fn from_wire(byte: u8) -> Option<Self> {
        Some(match byte.checked_sub(b'0')? {
            0 => Self::None,
            1 => Self::Estop,
            2 => Self::Unrecognised,
            3 => Self::Busy,
            4 => Self::WrongState,
            5 => Self::BadParameter,
            6 => Self::LimitExceeded,
            7 => Self::HardwareFault,
            8 => Self::HardwareFailure,
            9 => Self::NoComms,
            10 => Self::Unknown,
            _ => return None,
        })
    }

    pub fn is_none(self) -> bool {
        self == Self::None
    }
}

/// Subsystem a reported error originated from
///
/// Errors caused by a specific robot command carry that command's tag instead
/// of one of the named contexts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ErrorContext(pub u8);

impl ErrorContext {
    pub const NONE: Self = Self(b' ');
    pub const CONTROLLER: Self = Self(b'a');
    pub const CNC: Self = Self(b'b');
    pub const DCELL: Self = Self(b'c');
    pub const FORCE_DELTA: Self = Self(b'd');
    pub const ESTOP: Self = Self(b'e');
    pub const FORCE: Self = Self(b'f');
    pub const LFD: Self = Self(b'l');
    pub const MOTOR: Self = Self(b'm');

    /// Context naming a robot command tag
    pub const fn tag(tag: u8) -> Self {
        Self(tag)
    }
}

impl Default for ErrorContext {
    fn default() -> Self {
        Self::NONE
    }
}

/// Errors from encoding an outbound frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EncodeError {
    /// Output buffer too small for the frame
    BufferTooSmall,
}
