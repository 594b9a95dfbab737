//! Per-command state machines
//!
//! A [`Task`] is the command the dispatcher accepted plus its step counter.
//! Each family of commands has a handler module; all of them share the shape
//! `advance(task, ctx) -> TaskStatus` and are called once per loop
//! iteration until they report [`TaskStatus::Done`]. Handlers never block:
//! a step either finds what it needs (a reply, the end of motion) and moves
//! on, or returns [`TaskStatus::Pending`] to be polled again.

pub mod immediate;
pub mod passthrough;
pub mod round_trip;
pub mod sequence;

use penetrometer_protocol::{CncRequest, Command, ErrorCode, ErrorContext, RobotRequest};

use crate::config::{ControllerConfig, ProbeSettings};
use crate::mirror::DeviceMirror;
use crate::safety::{SharedSafetyState, Supervisor};
use crate::session::{CncPeer, DCellPeer, RobotPort};
use crate::traits::Board;

pub use passthrough::Relay;

/// What a task runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskCode {
    Command(Command),
    /// Robot tag the controller does not know
    Unrecognised(u8),
    /// Internal: work out why the estop chain dropped
    EstopDiagnosis,
}

/// Handler shape of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Family {
    /// Answered from local state in one step
    Immediate,
    /// One CNC request and its reply
    RoundTrip,
    /// Multi-step exchanges
    Sequence,
    /// Raw relay between the Robot and a peer
    Passthrough,
}

impl TaskCode {
    pub fn from_request(request: &RobotRequest) -> Self {
        request
            .command()
            .map_or(Self::Unrecognised(request.tag), Self::Command)
    }

    /// Tag used as error context for failures of this task
    pub fn tag(self) -> u8 {
        match self {
            Self::Command(command) => command.tag(),
            Self::Unrecognised(tag) => tag,
            Self::EstopDiagnosis => Command::SetEStop.tag(),
        }
    }

    pub fn family(self) -> Family {
        use Command::*;
        match self {
            Self::Unrecognised(_) => Family::Immediate,
            Self::EstopDiagnosis => Family::Sequence,
            Self::Command(command) => match command {
                Init | DoRefHome | DoProbe | GetForce | SetEStop => Family::Sequence,
                Done | Save | SetTopSpeed | SetSpeed | SetHomeSpeed | SetAccel | SetDecel
                | SetStepsPerX | SetEnable | GetEnable | GetHomeState | IsRefHomed => {
                    Family::RoundTrip
                }
                CncPassthrough | DCellPassthrough => Family::Passthrough,
                _ => Family::Immediate,
            },
        }
    }

    /// Runs even while estopped or with an error recorded
    pub fn always_permitted(self) -> bool {
        use Command::*;
        match self {
            Self::EstopDiagnosis => true,
            Self::Unrecognised(_) => false,
            Self::Command(command) => {
                matches!(command, None | SetEStop | GetEStop | ClearError | GetError | Log)
            }
        }
    }

    /// Holds off its first step until the axis is at rest
    ///
    /// A force query answers from the live sample stream instead.
    pub fn waits_for_rest(self) -> bool {
        !self.always_permitted() && self != Self::Command(Command::GetForce)
    }
}

/// An accepted command and its progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Task {
    pub code: TaskCode,
    pub parameter: i32,
    pub step: u8,
    /// Tick at which the current wait started, for steps that need one
    pub mark: Option<u32>,
}

impl Task {
    /// Create a task at step 0
    pub fn new(code: TaskCode, parameter: i32) -> Self {
        Self {
            code,
            parameter,
            step: 0,
            mark: None,
        }
    }

    pub fn next(&mut self) {
        self.step = self.step.saturating_add(1);
        self.mark = None;
    }
}

/// Result of advancing a task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum TaskStatus {
    Pending,
    Done,
    /// Abort the task and fault with this code and context
    Fault(ErrorCode, ErrorContext),
}

/// Everything a handler may touch
pub struct TaskContext<'a, B: Board> {
    pub now: u32,
    pub config: &'a ControllerConfig,
    pub shared: &'a SharedSafetyState,
    pub robot: &'a mut RobotPort<B::Robot>,
    pub cnc: &'a mut CncPeer<B::Cnc>,
    pub dcell: &'a mut DCellPeer<B::DCell>,
    pub machine: &'a mut B::Machine,
    pub supervisor: &'a mut Supervisor,
    pub mirror: &'a mut DeviceMirror,
    pub settings: &'a mut ProbeSettings,
    pub relay: &'a mut Relay,
}

impl<B: Board> TaskContext<'_, B> {
    /// Send a CNC request, logging it; false if the CNC is still busy
    pub fn send_cnc(&mut self, request: CncRequest) -> bool {
        self.send_cnc_with_timeout(request, self.config.timeouts.cnc_ticks)
    }

    pub fn send_cnc_with_timeout(&mut self, request: CncRequest, timeout: u32) -> bool {
        match self.cnc.send_with_timeout(request, self.now, timeout) {
            Ok(()) => {
                if let Ok(line) = request.encode() {
                    self.robot.log(&[b"Sent ", &line]);
                }
                true
            }
            Err(_) => false,
        }
    }

    /// Record an error caused by this task and report it
    pub fn reject(&mut self, code: ErrorCode, tag: u8) -> TaskStatus {
        let context = ErrorContext::tag(tag);
        self.supervisor.raise(code, context, self.shared);
        self.robot.error(code, context);
        TaskStatus::Done
    }

    /// Reply with the recorded error, or with the estop state if none
    pub fn report_error_or_estop(&mut self) {
        self.robot.report_status(&*self.supervisor, self.shared);
    }
}

/// Run one step of `task`
pub fn advance<B: Board>(task: &mut Task, ctx: &mut TaskContext<'_, B>) -> TaskStatus {
    match task.code.family() {
        Family::Immediate => immediate::advance(task, ctx),
        Family::RoundTrip => round_trip::advance(task, ctx),
        Family::Sequence => sequence::advance(task, ctx),
        Family::Passthrough => passthrough::advance(task, ctx),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code(tag: u8) -> TaskCode {
        TaskCode::from_request(&RobotRequest { tag, parameter: 0 })
    }

    #[test]
    fn test_families() {
        assert_eq!(code(b'@').family(), Family::Sequence);
        assert_eq!(code(b'!').family(), Family::Sequence);
        assert_eq!(code(b'W').family(), Family::Sequence);
        assert_eq!(code(b't').family(), Family::RoundTrip);
        assert_eq!(code(b'H').family(), Family::RoundTrip);
        assert_eq!(code(b'T').family(), Family::Immediate);
        assert_eq!(code(b'g').family(), Family::Immediate);
        assert_eq!(code(b'b').family(), Family::Passthrough);
        assert_eq!(code(b'w').family(), Family::Immediate);
        assert_eq!(code(b'w'), TaskCode::Unrecognised(b'w'));
    }

    #[test]
    fn test_gating_exemptions() {
        for tag in [b' ', b'e', b'E', b'f', b'F', b'#'] {
            assert!(code(tag).always_permitted(), "{}", tag as char);
        }
        for tag in [b'@', b'z', b'!', b'g', b'T', b'b', b'?'] {
            assert!(!code(tag).always_permitted(), "{}", tag as char);
        }
        assert!(TaskCode::EstopDiagnosis.always_permitted());
    }

    #[test]
    fn test_rest_wait() {
        assert!(code(b'z').waits_for_rest());
        assert!(!code(b'W').waits_for_rest());
        assert!(!code(b'e').waits_for_rest());
    }
}
