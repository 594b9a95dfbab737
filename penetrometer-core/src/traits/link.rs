//! Serial link abstraction

/// Receive-side failures reported by the UART
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Stop bit missing
    Framing,
    /// Parity mismatch
    Parity,
    /// Hardware FIFO overrun
    Overrun,
    /// Software receive buffer overflowed
    BufferOverflow,
}

/// Non-blocking byte link to one peer
///
/// Implementations wrap an interrupt-driven UART with receive and transmit
/// buffers. None of the methods may block.
pub trait ByteLink {
    /// Take the next received byte, if any
    fn try_read(&mut self) -> Result<Option<u8>, LinkError>;

    /// Queue bytes for transmission
    ///
    /// Bytes that do not fit in the transmit buffer are dropped.
    fn write(&mut self, bytes: &[u8]);

    /// True while queued bytes have not left the wire yet
    fn transmit_pending(&self) -> bool;

    /// Discard everything received so far
    fn flush_input(&mut self);
}
