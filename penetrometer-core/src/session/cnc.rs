//! Session with the CNC motion controller

use penetrometer_protocol::{
    CncErrorCode, CncReply, CncRequest, FrameStatus, LineAssembler, MAX_LINE_LEN,
};

use super::{PeerSession, SessionError};
use crate::traits::{ByteLink, LinkError};

/// Tag of the CNC's estop status line, also sent unsolicited
const ESTOP_TAG: u8 = b'E';

/// What one poll of the CNC link produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum CncEvent {
    Idle,
    /// The awaited reply arrived and is ready for [`CncPeer::take_reply`]
    Reply(CncReply),
    /// The CNC answered with an error code
    Error(CncErrorCode),
    /// Unsolicited estop status
    EstopReport(i32),
    /// A line nobody asked for
    Unexpected(CncReply),
    TimedOut,
    /// Line longer than the receive buffer
    Overflow,
    Link(LinkError),
}

/// CNC link plus its request session
pub struct CncPeer<L> {
    link: L,
    assembler: LineAssembler<MAX_LINE_LEN>,
    session: PeerSession,
    reply: Option<CncReply>,
}

impl<L: ByteLink> CncPeer<L> {
    /// Create a peer with the default reply timeout
    pub fn new(link: L, timeout: u32) -> Self {
        Self {
            link,
            assembler: LineAssembler::new(),
            session: PeerSession::new(timeout),
            reply: None,
        }
    }

    /// Transmit a request and start waiting for its acknowledgement
    pub fn send(&mut self, request: CncRequest, now: u32) -> Result<(), SessionError> {
        let line = request.encode().map_err(|_| SessionError::Encode)?;
        self.session.begin(request.expected_reply(), now)?;
        self.reply = None;
        self.link.write(&line);
        Ok(())
    }

    /// As [`send`](Self::send) with a request-specific timeout
    pub fn send_with_timeout(
        &mut self,
        request: CncRequest,
        now: u32,
        timeout: u32,
    ) -> Result<(), SessionError> {
        let line = request.encode().map_err(|_| SessionError::Encode)?;
        self.session
            .begin_with_timeout(request.expected_reply(), now, timeout)?;
        self.reply = None;
        self.link.write(&line);
        Ok(())
    }

    /// Read what has arrived and classify at most one complete line
    pub fn poll(&mut self, now: u32) -> CncEvent {
        while !self.assembler.is_ready() {
            match self.link.try_read() {
                Ok(Some(byte)) => {
                    if self.assembler.feed(byte) == FrameStatus::Overflow {
                        return CncEvent::Overflow;
                    }
                }
                Ok(None) => break,
                Err(error) => return CncEvent::Link(error),
            }
        }

        if !self.assembler.is_ready() {
            return if self.session.check_timeout(now) {
                CncEvent::TimedOut
            } else {
                CncEvent::Idle
            };
        }

        let reply = self.assembler.line().and_then(CncReply::parse);
        self.assembler.clear();
        match reply {
            Some(reply) => self.classify(reply),
            // Blank line
            None => CncEvent::Idle,
        }
    }

    fn classify(&mut self, reply: CncReply) -> CncEvent {
        if self.session.expected() == Some(reply.tag) {
            self.session.complete();
            self.reply = Some(reply);
            return CncEvent::Reply(reply);
        }

        if let Some(code) = reply.error_code() {
            if self.session.complete().is_some() && code.answers_request() {
                // Handed to the task in place of the awaited reply
                self.reply = Some(reply);
            }
            return CncEvent::Error(code);
        }

        if reply.tag == ESTOP_TAG {
            return CncEvent::EstopReport(reply.value);
        }

        CncEvent::Unexpected(reply)
    }

    /// Consume the reply delivered by the last [`CncEvent::Reply`]
    pub fn take_reply(&mut self) -> Option<CncReply> {
        self.reply.take()
    }

    pub fn is_awaiting(&self) -> bool {
        self.session.is_awaiting()
    }

    /// Forget the pending request and any unconsumed reply
    pub fn cancel(&mut self) {
        self.session.cancel();
        self.reply = None;
    }

    /// Cancel and discard everything received so far
    pub fn flush(&mut self) {
        self.cancel();
        self.assembler.clear();
        self.link.flush_input();
    }

    /// Raw access for passthrough
    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}
