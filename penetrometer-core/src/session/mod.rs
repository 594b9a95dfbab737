//! Request/reply bookkeeping for the serial peers
//!
//! Each peer has at most one request in flight. A session remembers which
//! reply tag it is waiting for and when the request left, and reports a
//! timeout exactly once per unanswered request. Sessions never retry.

pub mod cnc;
pub mod dcell;
pub mod robot;

pub use cnc::{CncEvent, CncPeer};
pub use dcell::{DCellEvent, DCellFault, DCellPeer, DCellPurpose};
pub use robot::{RobotEvent, RobotPort};

/// Errors starting a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SessionError {
    /// A request is already awaiting its reply
    Busy,
    /// The request could not be encoded
    Encode,
}

/// A request awaiting its reply
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PendingRequest {
    pub expected: u8,
    pub sent_at: u32,
    pub timeout: u32,
}

/// Single-slot request tracker
#[derive(Debug, Clone)]
pub struct PeerSession {
    pending: Option<PendingRequest>,
    timeout: u32,
}

impl PeerSession {
    /// Create a session with the default reply timeout in ticks
    pub const fn new(timeout: u32) -> Self {
        Self {
            pending: None,
            timeout,
        }
    }

    /// Start waiting for `expected` using the default timeout
    pub fn begin(&mut self, expected: u8, now: u32) -> Result<(), SessionError> {
        self.begin_with_timeout(expected, now, self.timeout)
    }

    pub fn begin_with_timeout(
        &mut self,
        expected: u8,
        now: u32,
        timeout: u32,
    ) -> Result<(), SessionError> {
        if self.pending.is_some() {
            return Err(SessionError::Busy);
        }
        self.pending = Some(PendingRequest {
            expected,
            sent_at: now,
            timeout,
        });
        Ok(())
    }

    pub fn expected(&self) -> Option<u8> {
        self.pending.map(|p| p.expected)
    }

    pub fn is_awaiting(&self) -> bool {
        self.pending.is_some()
    }

    /// The reply arrived
    pub fn complete(&mut self) -> Option<PendingRequest> {
        self.pending.take()
    }

    /// True once when the pending request has gone unanswered too long
    pub fn check_timeout(&mut self, now: u32) -> bool {
        match self.pending {
            Some(p) if now.wrapping_sub(p.sent_at) > p.timeout => {
                self.pending = None;
                true
            }
            _ => false,
        }
    }

    /// Forget the pending request; a late reply will be ignored
    pub fn cancel(&mut self) {
        self.pending = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_single_request_in_flight() {
        let mut session = PeerSession::new(100);
        assert!(session.begin(b'H', 0).is_ok());
        assert_eq!(session.begin(b'T', 1), Err(SessionError::Busy));
        assert_eq!(session.expected(), Some(b'H'));
        assert!(session.complete().is_some());
        assert!(session.begin(b'T', 2).is_ok());
    }

    #[test]
    fn test_timeout_boundary() {
        let mut session = PeerSession::new(100);
        session.begin(b'H', 10).unwrap();
        assert!(!session.check_timeout(110));
        assert!(session.check_timeout(111));
        assert!(!session.is_awaiting());
    }

    #[test]
    fn test_timeout_across_wrap() {
        let mut session = PeerSession::new(100);
        session.begin(b'H', u32::MAX - 10).unwrap();
        assert!(!session.check_timeout(50));
        assert!(session.check_timeout(90));
    }

    #[test]
    fn test_cancel() {
        let mut session = PeerSession::new(100);
        session.begin(b'H', 0).unwrap();
        session.cancel();
        assert!(!session.check_timeout(1000));
    }

    proptest! {
        #[test]
        fn prop_exactly_one_timeout(timeout in 1u32..500, polls in prop::collection::vec(0u32..50, 1..100)) {
            let mut session = PeerSession::new(timeout);
            session.begin(b'Z', 0).unwrap();
            let mut now = 0u32;
            let mut fired = 0;
            for step in polls {
                now += step;
                if session.check_timeout(now) {
                    fired += 1;
                }
            }
            now += timeout + 1;
            if session.check_timeout(now) {
                fired += 1;
            }
            prop_assert_eq!(fired, 1);
        }
    }
}
