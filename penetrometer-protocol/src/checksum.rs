//! CRC-16/Modbus for the DCell link.
//!
//! Polynomial 0xA001 (reflected 0x8005), initial value 0xFFFF, no final XOR.
//! The checksum travels little-endian as the last two bytes of every frame.

/// Initial CRC register value
const CRC_INIT: u16 = 0xFFFF;

/// Reflected polynomial
const CRC_POLY: u16 = 0xA001;

/// Compute the CRC-16/Modbus of `data`
pub fn compute(data: &[u8]) -> u16 {
    let mut crc = CRC_INIT;
    for &byte in data {
        crc ^= byte as u16;
        for _ in 0..8 {
            if crc & 0x0001 != 0 {
                crc = (crc >> 1) ^ CRC_POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}

/// Write the checksum of `frame[..len - 2]` into the last two bytes
///
/// Frames shorter than two bytes are left untouched.
pub fn append(frame: &mut [u8]) {
    if frame.len() < 2 {
        return;
    }
    let body = frame.len() - 2;
    let [lo, hi] = compute(&frame[..body]).to_le_bytes();
    frame[body] = lo;
    frame[body + 1] = hi;
}

/// Check the trailing checksum of a received frame
pub fn verify(frame: &[u8]) -> bool {
    if frame.len() < 3 {
        return false;
    }
    let body = frame.len() - 2;
    let received = u16::from_le_bytes([frame[body], frame[body + 1]]);
    compute(&frame[..body]) == received
}
