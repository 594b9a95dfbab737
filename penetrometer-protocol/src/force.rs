//! Load-cell force decoding
//!
//! The DCell reports its calibrated reading as a proprietary 32-bit float
//! spread over two Modbus registers. Only the bytes below carry information:
//!
//! ```text
//! byte 0: MMMMMMMM   low mantissa
//! byte 2: SEEEEEEE   sign + high exponent
//! byte 3: EMMMMMMM   low exponent bit + high mantissa
//! ```
//!
//! The result is scaled so that an exponent of 13 yields the mantissa
//! unchanged, i.e. `mantissa * 2^(e - 13)` rounded half up.

/// Exponent at which the mantissa passes through unscaled
const UNITY_EXPONENT: u16 = 13;

/// The four register data bytes of a force read response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawForce {
    pub bytes: [u8; 4],
}

impl RawForce {
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self { bytes }
    }

    /// Extract the data bytes from a complete read response
    ///
    /// The response layout is station, function, byte count, four data bytes,
    /// CRC.
    pub fn from_response(frame: &[u8]) -> Option<Self> {
        let data = frame.get(3..7)?;
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(data);
        Some(Self { bytes })
    }

    /// Decode to a calibrated force
    pub fn decode(&self) -> i16 {
        decode_force(*self)
    }
}

/// Convert a raw reading into a signed, calibrated force
pub fn decode_force(raw: RawForce) -> i16 {
    let [b0, _, b2, b3] = raw.bytes;

    let mantissa = ((((b3 as u16) << 8 | b0 as u16) & 0x7FFE) >> 1) | 0x4000;
    let exponent = (((b2 as u16) << 8 | b3 as u16) & 0x7F80) >> 7;

    // Exponent below the bias: magnitude rounds to zero
    if exponent & 0x80 == 0 {
        return 0;
    }
    let exponent = exponent & 0x7F;

    let magnitude = if exponent > UNITY_EXPONENT {
        i16::MAX
    } else if exponent == UNITY_EXPONENT {
        mantissa as i16
    } else {
        let mut scaled = mantissa >> (UNITY_EXPONENT - 1 - exponent);
        if scaled & 1 != 0 {
            scaled += 1;
        }
        (scaled >> 1) as i16
    };

    if b2 & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    }
}
