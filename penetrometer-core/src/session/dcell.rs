//! Session with the DCell load cell

use heapless::Vec;
use penetrometer_protocol::dcell::WRITE_REQUEST_LEN;
use penetrometer_protocol::frame::MAX_DCELL_FRAME;
use penetrometer_protocol::{
    verify_crc, DCellAssembler, DCellError, DCellReply, DCellRequest, FrameStatus,
};

use super::{PeerSession, SessionError};
use crate::traits::{ByteLink, LinkError};

/// Exception responses set the top bit of the function code
const EXCEPTION_FLAG: u8 = 0x80;

/// Who is waiting for the DCell reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DCellPurpose {
    /// Streamed sample requested by a step pulse
    Sample,
    /// Reading requested by a task
    Query,
    /// Raw request forwarded from the Robot
    Relay,
}

/// Reasons a DCell exchange failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DCellFault {
    BadChecksum,
    BadFunction,
    /// The DCell answered with an exception code
    Exception(u8),
    Overflow,
}

impl From<DCellError> for DCellFault {
    fn from(error: DCellError) -> Self {
        match error {
            DCellError::BadChecksum => Self::BadChecksum,
            DCellError::BadFunction => Self::BadFunction,
        }
    }
}

/// What one poll of the DCell link produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DCellEvent {
    Idle,
    /// A streamed sample arrived
    Sample(DCellReply),
    /// A task's reading is ready for [`DCellPeer::take_reply`]
    Reply(DCellReply),
    /// A relayed response is ready for [`DCellPeer::take_relay`]
    Relayed,
    /// A bad frame; the purpose is `None` when nothing was pending
    Fault(Option<DCellPurpose>, DCellFault),
    TimedOut(DCellPurpose),
    /// A well-formed frame arrived with nothing pending
    Unexpected,
    Link(LinkError),
}

/// DCell link plus its request session
pub struct DCellPeer<L> {
    link: L,
    assembler: DCellAssembler,
    session: PeerSession,
    purpose: Option<DCellPurpose>,
    reply: Option<DCellReply>,
    relay: Option<Vec<u8, MAX_DCELL_FRAME>>,
}

impl<L: ByteLink> DCellPeer<L> {
    /// Create a peer with the given reply timeout
    pub fn new(link: L, timeout: u32) -> Self {
        Self {
            link,
            assembler: DCellAssembler::new(),
            session: PeerSession::new(timeout),
            purpose: None,
            reply: None,
            relay: None,
        }
    }

    /// Transmit a register request
    pub fn send(
        &mut self,
        request: DCellRequest,
        purpose: DCellPurpose,
        now: u32,
    ) -> Result<(), SessionError> {
        let mut frame = [0u8; WRITE_REQUEST_LEN];
        let len = request.encode(&mut frame);
        self.send_raw(&frame[..len], purpose, now)
    }

    /// Transmit an already framed request
    pub fn send_raw(
        &mut self,
        frame: &[u8],
        purpose: DCellPurpose,
        now: u32,
    ) -> Result<(), SessionError> {
        let function = frame.get(1).copied().ok_or(SessionError::Encode)?;
        self.session.begin(function, now)?;
        self.purpose = Some(purpose);
        self.reply = None;
        self.relay = None;
        self.assembler.clear();
        self.link.write(frame);
        Ok(())
    }

    /// Read what has arrived and classify a complete frame
    pub fn poll(&mut self, now: u32) -> DCellEvent {
        while !self.assembler.is_ready() {
            match self.link.try_read() {
                Ok(Some(byte)) => match self.assembler.feed(byte) {
                    FrameStatus::Overflow => return self.fail(DCellFault::Overflow),
                    FrameStatus::Malformed => return self.fail(DCellFault::BadFunction),
                    FrameStatus::Incomplete | FrameStatus::Complete => {}
                },
                Ok(None) => break,
                Err(error) => return DCellEvent::Link(error),
            }
        }

        if !self.assembler.is_ready() {
            if self.session.check_timeout(now) {
                self.assembler.clear();
                let purpose = self.purpose.take().unwrap_or(DCellPurpose::Query);
                return DCellEvent::TimedOut(purpose);
            }
            return DCellEvent::Idle;
        }

        let Some(expected) = self.session.expected() else {
            let intact = self.assembler.frame().is_some_and(verify_crc);
            self.assembler.clear();
            return if intact {
                DCellEvent::Unexpected
            } else {
                self.fail(DCellFault::BadChecksum)
            };
        };
        let purpose = self.purpose.unwrap_or(DCellPurpose::Query);
        let frame = self.assembler.frame().unwrap_or(&[]);
        let function = frame.get(1).copied().unwrap_or(0);

        let event = if purpose == DCellPurpose::Relay {
            self.relay = Vec::from_slice(frame).ok();
            Ok(None)
        } else if function & !EXCEPTION_FLAG != expected {
            Err(DCellFault::BadFunction)
        } else {
            DCellReply::parse(frame)
                .map_err(DCellFault::from)
                .and_then(|reply| match reply {
                    DCellReply::Exception(code) => Err(DCellFault::Exception(code)),
                    reply => Ok(Some(reply)),
                })
        };
        self.assembler.clear();

        match event {
            Err(fault) => self.fail(fault),
            Ok(reply) => {
                self.session.complete();
                match (self.purpose.take(), reply) {
                    (Some(DCellPurpose::Sample), Some(reply)) => DCellEvent::Sample(reply),
                    (_, Some(reply)) => {
                        self.reply = Some(reply);
                        DCellEvent::Reply(reply)
                    }
                    (_, None) => DCellEvent::Relayed,
                }
            }
        }
    }

    /// A corrupt or unknown frame is a link fault even when unsolicited
    fn fail(&mut self, fault: DCellFault) -> DCellEvent {
        let purpose = self
            .session
            .complete()
            .and_then(|_| self.purpose.take());
        self.purpose = None;
        DCellEvent::Fault(purpose, fault)
    }

    /// Consume a task's reading
    pub fn take_reply(&mut self) -> Option<DCellReply> {
        self.reply.take()
    }

    /// Consume a relayed response frame
    pub fn take_relay(&mut self) -> Option<Vec<u8, MAX_DCELL_FRAME>> {
        self.relay.take()
    }

    pub fn is_awaiting(&self) -> bool {
        self.session.is_awaiting()
    }

    /// Purpose of the request in flight
    pub fn awaiting(&self) -> Option<DCellPurpose> {
        self.purpose.filter(|_| self.session.is_awaiting())
    }

    /// Forget the pending request and anything unconsumed
    pub fn cancel(&mut self) {
        self.session.cancel();
        self.purpose = None;
        self.reply = None;
        self.relay = None;
        self.assembler.clear();
    }
}
