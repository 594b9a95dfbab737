//! Byte links backed by static pipes
//!
//! The control loop never awaits, so each peer's UART is pumped by its own
//! task through a pair of pipes. The loop side only ever uses the `try_`
//! half of the pipe API.
//!
//! ```text
//!   UART rx ──pump_rx──▶ rx pipe ──try_read──▶ Controller
//!   UART tx ◀──pump_tx── tx pipe ◀──write───── Controller
//! ```

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::pipe::Pipe;
use embassy_sync::signal::Signal;
use embedded_io_async::{Read, Write};
use portable_atomic::{AtomicBool, Ordering};

use penetrometer_core::{ByteLink, LinkError};

/// Bytes buffered in each direction
pub const LINK_BUFFER_SIZE: usize = 256;

/// Chunk moved per UART transfer
const CHUNK: usize = 32;

/// Map a UART driver error onto the link error the controller sees
pub trait LinkFault {
    fn link_error(&self) -> LinkError;
}

impl LinkFault for embassy_rp::uart::Error {
    fn link_error(&self) -> LinkError {
        match self {
            embassy_rp::uart::Error::Overrun => LinkError::Overrun,
            embassy_rp::uart::Error::Parity => LinkError::Parity,
            // A break is a framing error held for a whole frame
            _ => LinkError::Framing,
        }
    }
}

/// PIO UARTs cannot fail
impl LinkFault for core::convert::Infallible {
    fn link_error(&self) -> LinkError {
        match *self {}
    }
}

/// Static buffers shared by one peer's pump tasks and its [`PipeLink`]
pub struct LinkBuffers {
    rx: Pipe<CriticalSectionRawMutex, LINK_BUFFER_SIZE>,
    tx: Pipe<CriticalSectionRawMutex, LINK_BUFFER_SIZE>,
    fault: Signal<CriticalSectionRawMutex, LinkError>,
    sending: AtomicBool,
}

impl Default for LinkBuffers {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkBuffers {
    /// Create a new set of empty buffers
    pub const fn new() -> Self {
        Self {
            rx: Pipe::new(),
            tx: Pipe::new(),
            fault: Signal::new(),
            sending: AtomicBool::new(false),
        }
    }

    /// The control loop's end of these buffers
    pub fn link(&'static self) -> PipeLink {
        PipeLink { buffers: self }
    }

    /// Move received bytes into the rx pipe, forever
    ///
    /// Bytes the loop has no room for are dropped and reported as
    /// [`LinkError::BufferOverflow`]; the UART is never stalled.
    pub async fn pump_rx<R>(&self, rx: &mut R) -> !
    where
        R: Read,
        R::Error: LinkFault,
    {
        let mut buf = [0u8; CHUNK];
        loop {
            match rx.read(&mut buf).await {
                Ok(0) => {}
                Ok(n) => {
                    let stored = self.rx.try_write(&buf[..n]).unwrap_or(0);
                    if stored < n {
                        self.fault.signal(LinkError::BufferOverflow);
                    }
                }
                Err(error) => self.fault.signal(error.link_error()),
            }
        }
    }

    /// Drain the tx pipe into the UART, forever
    pub async fn pump_tx<W: Write>(&self, tx: &mut W) -> ! {
        let mut buf = [0u8; CHUNK];
        loop {
            let n = self.tx.read(&mut buf).await;
            // A lost chunk surfaces as a peer timeout
            if tx.write_all(&buf[..n]).await.is_err() || tx.flush().await.is_err() {
                #[cfg(feature = "defmt")]
                defmt::warn!("UART write failed, {} bytes lost", n);
            }
            if self.tx.is_empty() {
                self.sending.store(false, Ordering::Release);
            }
        }
    }
}

/// Non-blocking [`ByteLink`] over a peer's [`LinkBuffers`]
pub struct PipeLink {
    buffers: &'static LinkBuffers,
}

impl ByteLink for PipeLink {
    fn try_read(&mut self) -> Result<Option<u8>, LinkError> {
        if let Some(error) = self.buffers.fault.try_take() {
            return Err(error);
        }
        let mut byte = [0u8];
        match self.buffers.rx.try_read(&mut byte) {
            Ok(1) => Ok(Some(byte[0])),
            _ => Ok(None),
        }
    }

    fn write(&mut self, bytes: &[u8]) {
        self.buffers.sending.store(true, Ordering::Release);
        let mut rest = bytes;
        while !rest.is_empty() {
            match self.buffers.tx.try_write(rest) {
                Ok(n) => rest = &rest[n..],
                Err(_) => {
                    #[cfg(feature = "defmt")]
                    defmt::warn!("tx pipe full, dropped {} bytes", rest.len());
                    break;
                }
            }
        }
    }

    fn transmit_pending(&self) -> bool {
        !self.buffers.tx.is_empty() || self.buffers.sending.load(Ordering::Acquire)
    }

    fn flush_input(&mut self) {
        self.buffers.rx.clear();
        self.buffers.fault.reset();
    }
}
