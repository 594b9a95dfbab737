//! Byte-at-a-time frame assembly for the three links.
//!
//! - [`LineAssembler`]: robot and CNC links, complete on `\n` (a preceding
//!   `\r` is dropped).
//! - [`DCellAssembler`]: Modbus link, the function code in byte 1 decides the
//!   frame length.
//!
//! Once a frame is complete the owner consumes it and calls `clear()` before
//! feeding further bytes.

use heapless::Vec;

use crate::dcell::DCellFunction;

/// Line terminator on the ASCII links
pub const LINE_END: u8 = b'\n';

/// Largest DCell response frame
pub const MAX_DCELL_FRAME: usize = 16;

/// Result of feeding one byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FrameStatus {
    /// More bytes needed
    Incomplete,
    /// A complete frame is ready
    Complete,
    /// Capacity exceeded before completion; the buffer was discarded
    Overflow,
    /// Frame cannot be valid (unknown function code); the buffer was discarded
    Malformed,
}

/// Assembler for newline-terminated ASCII frames
#[derive(Debug, Clone)]
pub struct LineAssembler<const N: usize> {
    buffer: Vec<u8, N>,
    ready: bool,
}

impl<const N: usize> Default for LineAssembler<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> LineAssembler<N> {
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            ready: false,
        }
    }

    /// Feed one received byte
    pub fn feed(&mut self, byte: u8) -> FrameStatus {
        if self.ready {
            return FrameStatus::Complete;
        }

        if byte == LINE_END {
            if self.buffer.last() == Some(&b'\r') {
                self.buffer.pop();
            }
            self.ready = true;
            return FrameStatus::Complete;
        }

        if self.buffer.push(byte).is_err() {
            self.clear();
            return FrameStatus::Overflow;
        }
        FrameStatus::Incomplete
    }

    /// The completed line without its terminator
    pub fn line(&self) -> Option<&[u8]> {
        self.ready.then_some(self.buffer.as_slice())
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Bytes collected so far (complete or not)
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }

    /// Discard the current frame
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.ready = false;
    }
}

/// Assembler for Modbus RTU responses from the DCell
#[derive(Debug, Clone, Default)]
pub struct DCellAssembler {
    buffer: Vec<u8, MAX_DCELL_FRAME>,
    expected: Option<usize>,
    ready: bool,
}

impl DCellAssembler {
    pub const fn new() -> Self {
        Self {
            buffer: Vec::new(),
            expected: None,
            ready: false,
        }
    }

    /// Feed one received byte
    pub fn feed(&mut self, byte: u8) -> FrameStatus {
        if self.ready {
            return FrameStatus::Complete;
        }

        if self.buffer.push(byte).is_err() {
            self.clear();
            return FrameStatus::Overflow;
        }

        if self.buffer.len() == 2 {
            match DCellFunction::from_byte(byte).map(DCellFunction::response_len) {
                Some(len) => self.expected = Some(len),
                None => {
                    self.clear();
                    return FrameStatus::Malformed;
                }
            }
        }

        if self.expected == Some(self.buffer.len()) {
            self.ready = true;
            return FrameStatus::Complete;
        }
        FrameStatus::Incomplete
    }

    /// The completed frame including its CRC
    pub fn frame(&self) -> Option<&[u8]> {
        self.ready.then_some(self.buffer.as_slice())
    }

    pub fn is_ready(&self) -> bool {
        self.ready
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
        self.expected = None;
        self.ready = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_line_complete() {
        let mut asm: LineAssembler<16> = LineAssembler::new();
        for &b in b"g250" {
            assert_eq!(asm.feed(b), FrameStatus::Incomplete);
        }
        assert_eq!(asm.line(), None);
        assert_eq!(asm.feed(b'\n'), FrameStatus::Complete);
        assert_eq!(asm.line(), Some(&b"g250"[..]));

        asm.clear();
        assert!(!asm.is_ready());
        assert!(asm.pending().is_empty());
    }

    #[test]
    fn test_line_strips_carriage_return() {
        let mut asm: LineAssembler<16> = LineAssembler::new();
        for &b in b"T120\r\n" {
            asm.feed(b);
        }
        assert_eq!(asm.line(), Some(&b"T120"[..]));
    }

    #[test]
    fn test_line_overflow_resyncs() {
        let mut asm: LineAssembler<4> = LineAssembler::new();
        for &b in b"abcd" {
            assert_eq!(asm.feed(b), FrameStatus::Incomplete);
        }
        assert_eq!(asm.feed(b'e'), FrameStatus::Overflow);
        assert!(asm.pending().is_empty());

        for &b in b"E1\n" {
            asm.feed(b);
        }
        assert_eq!(asm.line(), Some(&b"E1"[..]));
    }

    #[test]
    fn test_empty_line() {
        let mut asm: LineAssembler<4> = LineAssembler::new();
        assert_eq!(asm.feed(b'\n'), FrameStatus::Complete);
        assert_eq!(asm.line(), Some(&b""[..]));
    }

    #[test]
    fn test_dcell_read_response() {
        let mut asm = DCellAssembler::new();
        let frame = [0x01, 0x03, 0x04, 0x00, 0x00, 0x46, 0x80, 0x00, 0x00];
        for &b in &frame[..8] {
            assert_eq!(asm.feed(b), FrameStatus::Incomplete);
        }
        assert_eq!(asm.feed(frame[8]), FrameStatus::Complete);
        assert_eq!(asm.frame(), Some(&frame[..]));
    }

    #[test]
    fn test_dcell_exception_response() {
        let mut asm = DCellAssembler::new();
        for &b in &[0x01, 0x83, 0x02, 0xC0] {
            assert_eq!(asm.feed(b), FrameStatus::Incomplete);
        }
        assert_eq!(asm.feed(0xF1), FrameStatus::Complete);
    }

    #[test]
    fn test_dcell_unknown_function() {
        let mut asm = DCellAssembler::new();
        asm.feed(0x01);
        assert_eq!(asm.feed(0x42), FrameStatus::Malformed);
        assert!(!asm.is_ready());
        assert_eq!(asm.frame(), None);
    }

    fn table_len(function: u8) -> Option<usize> {
        match function {
            0x03 => Some(9),
            0x10 => Some(8),
            0x83 | 0x90 => Some(5),
            _ => None,
        }
    }

    proptest! {
        #[test]
        fn dcell_completes_exactly_at_table_length(
            bytes in proptest::collection::vec(any::<u8>(), 0..64),
        ) {
            let mut asm = DCellAssembler::new();
            let mut count = 0usize;
            let mut function = None;

            for b in bytes {
                count += 1;
                if count == 2 {
                    function = Some(b);
                }
                let status = asm.feed(b);

                match (count, function.and_then(table_len)) {
                    (2, None) => {
                        prop_assert_eq!(status, FrameStatus::Malformed);
                        count = 0;
                        function = None;
                    }
                    (n, Some(len)) if n == len => {
                        prop_assert_eq!(status, FrameStatus::Complete);
                        asm.clear();
                        count = 0;
                        function = None;
                    }
                    _ => prop_assert_eq!(status, FrameStatus::Incomplete),
                }
            }
        }
    }
}
