//! ASCII decimal helpers shared by the line protocols

use heapless::Vec;

use crate::error::EncodeError;

/// Parse a leading decimal integer the way the peers write them
///
/// Leading spaces are skipped, an optional sign is accepted and parsing stops
/// at the first non-digit. No digits yields 0. Values saturate at the `i32`
/// bounds.
pub(crate) fn parse(bytes: &[u8]) -> i32 {
    let mut iter = bytes.iter().copied().skip_while(|b| *b == b' ').peekable();

    let negative = match iter.peek() {
        Some(b'-') => {
            iter.next();
            true
        }
        Some(b'+') => {
            iter.next();
            false
        }
        _ => false,
    };

    let mut value: i64 = 0;
    for b in iter {
        if !b.is_ascii_digit() {
            break;
        }
        value = (value * 10 + (b - b'0') as i64).min(i32::MAX as i64 + 1);
    }

    let value = if negative { -value } else { value };
    value.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Append the decimal text of `value`
pub(crate) fn push<const N: usize>(out: &mut Vec<u8, N>, value: i32) -> Result<(), EncodeError> {
    let mut digits = [0u8; 10];
    let mut len = 0;
    let mut magnitude = value.unsigned_abs();

    loop {
        digits[len] = b'0' + (magnitude % 10) as u8;
        len += 1;
        magnitude /= 10;
        if magnitude == 0 {
            break;
        }
    }

    if value < 0 {
        out.push(b'-').map_err(|_| EncodeError::BufferTooSmall)?;
    }
    for &d in digits[..len].iter().rev() {
        out.push(d).map_err(|_| EncodeError::BufferTooSmall)?;
    }
    Ok(())
}
