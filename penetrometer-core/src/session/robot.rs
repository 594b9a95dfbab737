//! The Robot link
//!
//! The Robot drives the controller; it is never waited on, so there is no
//! request session here. Any byte from the Robot proves it is alive and
//! reloads the watchdog.

use penetrometer_protocol::robot::{self, RobotFrame};
use penetrometer_protocol::{
    Command, ErrorCode, ErrorContext, FrameStatus, LineAssembler, RobotRequest, MAX_LINE_LEN,
};

use crate::safety::{SharedSafetyState, Supervisor};
use crate::traits::{ByteLink, LinkError};

/// What one poll of the Robot link produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RobotEvent {
    Idle,
    Request(RobotRequest),
    Overflow,
    Link(LinkError),
}

/// Robot link, line assembler and diagnostic logging switch
pub struct RobotPort<L> {
    link: L,
    assembler: LineAssembler<MAX_LINE_LEN>,
    logging: bool,
    watchdog_ticks: u32,
}

impl<L: ByteLink> RobotPort<L> {
    /// Create a port; every received byte reloads the watchdog with
    /// `watchdog_ticks`
    pub fn new(link: L, watchdog_ticks: u32) -> Self {
        Self {
            link,
            assembler: LineAssembler::new(),
            logging: false,
            watchdog_ticks,
        }
    }

    /// Read what has arrived and return at most one request
    pub fn poll(&mut self, shared: &SharedSafetyState) -> RobotEvent {
        loop {
            match self.link.try_read() {
                Ok(Some(byte)) => {
                    shared.feed_watchdog(self.watchdog_ticks);
                    match self.assembler.feed(byte) {
                        FrameStatus::Complete => break,
                        FrameStatus::Overflow => return RobotEvent::Overflow,
                        FrameStatus::Incomplete | FrameStatus::Malformed => {}
                    }
                }
                Ok(None) => return RobotEvent::Idle,
                Err(error) => return RobotEvent::Link(error),
            }
        }

        let request = RobotRequest::parse(self.assembler.line().unwrap_or(&[]));
        self.assembler.clear();
        RobotEvent::Request(request)
    }

    /// Read one raw byte for passthrough
    pub fn read_raw(&mut self, shared: &SharedSafetyState) -> Option<u8> {
        let byte = self.link.try_read().ok().flatten()?;
        shared.feed_watchdog(self.watchdog_ticks);
        Some(byte)
    }

    pub fn write_raw(&mut self, bytes: &[u8]) {
        self.link.write(bytes);
    }

    /// Discard a partially received line
    pub fn reset_line(&mut self) {
        self.assembler.clear();
    }

    fn send(&mut self, frame: Result<RobotFrame, penetrometer_protocol::EncodeError>) {
        if let Ok(frame) = frame {
            self.link.write(&frame);
        }
    }

    /// `<tag><value>`
    pub fn reply(&mut self, tag: u8, value: i32) {
        self.send(robot::encode_reply(tag, value));
    }

    /// `<tag>0` or `<tag>1`
    pub fn reply_flag(&mut self, tag: u8, flag: bool) {
        self.reply(tag, i32::from(flag));
    }

    /// `F<code><context>`
    pub fn error(&mut self, code: ErrorCode, context: ErrorContext) {
        self.send(robot::encode_error(code, context));
    }

    pub fn ping(&mut self) {
        self.send(robot::encode_ping());
    }

    /// Probe telemetry
    pub fn sample(&mut self, index: i32, force: i32) {
        self.send(robot::encode_sample(index, force));
    }

    /// `# ...` diagnostic, only while logging is on
    pub fn log(&mut self, parts: &[&[u8]]) {
        if self.logging {
            let frame = robot::encode_log(parts);
            self.link.write(&frame);
        }
    }

    /// `# <prefix><tag><value>` diagnostic
    pub fn log_value(&mut self, prefix: &[u8], tag: u8, value: i32) {
        if self.logging {
            if let Ok(rendered) = robot::encode_reply(tag, value) {
                let frame = robot::encode_log(&[prefix, rendered.trim_ascii_end()]);
                self.link.write(&frame);
            }
        }
    }

    /// Report the recorded error, or the estop state when there is none
    pub fn report_status(&mut self, supervisor: &Supervisor, shared: &SharedSafetyState) {
        if supervisor.has_error() {
            let (code, context) = supervisor.error();
            self.error(code, context);
        } else {
            self.reply_flag(Command::GetEStop.tag(), shared.is_estopped());
        }
    }

    pub fn logging(&self) -> bool {
        self.logging
    }

    pub fn set_logging(&mut self, on: bool) {
        self.logging = on;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::MockLink;

    fn port() -> (RobotPort<MockLink>, MockLink) {
        let link = MockLink::default();
        (RobotPort::new(link.clone(), 3000), link)
    }

    #[test]
    fn test_request_and_watchdog_feed() {
        let shared = SharedSafetyState::new();
        let (mut robot, link) = port();

        link.push_rx(b"g25");
        assert_eq!(robot.poll(&shared), RobotEvent::Idle);
        // Partial input already counts as activity
        shared.on_tick(true);
        assert!(!shared.take_watchdog_expired());

        link.push_rx(b"00\n");
        match robot.poll(&shared) {
            RobotEvent::Request(request) => {
                assert_eq!(request.command(), Some(Command::SetGroundLevel));
                assert_eq!(request.parameter, 2500);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_blank_line_is_ping() {
        let shared = SharedSafetyState::new();
        let (mut robot, link) = port();
        link.push_rx(b"\r\n");
        assert!(matches!(
            robot.poll(&shared),
            RobotEvent::Request(RobotRequest { tag: b' ', .. })
        ));
    }

    #[test]
    fn test_log_only_when_enabled() {
        let (mut robot, link) = port();
        robot.log(&[b"hidden"]);
        assert!(link.take_tx().is_empty());
        robot.set_logging(true);
        robot.log(&[b"Cnc timeout"]);
        assert_eq!(&link.take_tx()[..], b"# Cnc timeout\n");
    }

    #[test]
    fn test_replies() {
        let (mut robot, link) = port();
        robot.reply(b'Z', 1);
        robot.reply_flag(b'E', false);
        robot.error(ErrorCode::Busy, ErrorContext::tag(b'g'));
        robot.sample(12, -4);
        assert_eq!(link.take_lines(), ["Z1", "E0", "F3g", "*12,-4"]);
    }

    #[test]
    fn test_log_value() {
        let (mut robot, link) = port();
        robot.set_logging(true);
        robot.log_value(b"Cnc ", b'T', 200);
        assert_eq!(&link.take_tx()[..], b"# Cnc T200\n");
    }

    #[test]
    fn test_report_status() {
        let shared = SharedSafetyState::new();
        let mut supervisor = Supervisor::new();
        let (mut robot, link) = port();

        robot.report_status(&supervisor, &shared);
        shared.latch_estop();
        robot.report_status(&supervisor, &shared);
        supervisor.record(ErrorCode::NoComms, ErrorContext::CNC);
        robot.report_status(&supervisor, &shared);
        assert_eq!(link.take_lines(), ["E0", "E1", "F9b"]);
    }
}
