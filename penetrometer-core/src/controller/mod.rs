//! The control loop
//!
//! [`Controller::poll`] is one iteration of the cooperative loop. It never
//! blocks. Each call services, in order:
//!
//! 1. events raised by interrupt handlers (estop edge, sample overlap,
//!    sample requests)
//! 2. the Robot link (arbitration, then one step of the active task)
//! 3. the CNC link
//! 4. the DCell link
//! 5. the supervisor (LFD trip, Robot watchdog)
//!
//! Any fault latches estop, aborts the active task and is reported to the
//! Robot once.

use penetrometer_protocol::{
    CncCommand, CncErrorCode, CncRequest, Command, DCellReply, DCellRequest, ErrorCode,
    ErrorContext, RobotRequest,
};

use crate::config::{ControllerConfig, ProbeSettings};
use crate::dispatcher::{Admission, DispatchState, Dispatcher};
use crate::mirror::DeviceMirror;
use crate::safety::{SafetyEvent, SampleVerdict, SharedSafetyState, Supervisor};
use crate::session::{
    CncEvent, CncPeer, DCellEvent, DCellPeer, DCellPurpose, RobotEvent, RobotPort,
};
use crate::task::{self, Relay, Task, TaskCode, TaskContext, TaskStatus};
use crate::traits::{Board, MachineIo};

#[cfg(test)]
mod tests;

/// Penetrometer controller
pub struct Controller<'a, B: Board> {
    config: ControllerConfig,
    shared: &'a SharedSafetyState,
    robot: RobotPort<B::Robot>,
    cnc: CncPeer<B::Cnc>,
    dcell: DCellPeer<B::DCell>,
    machine: B::Machine,
    supervisor: Supervisor,
    dispatcher: Dispatcher,
    mirror: DeviceMirror,
    settings: ProbeSettings,
    relay: Relay,
    /// A step pulse asked for a sample that has not been sent yet
    sample_due: bool,
    /// Sample index captured when the outstanding sample was requested
    sample_tag: i32,
}

impl<'a, B: Board> Controller<'a, B> {
    /// Create a controller and arm the Robot watchdog
    pub fn new(
        config: ControllerConfig,
        shared: &'a SharedSafetyState,
        robot: B::Robot,
        cnc: B::Cnc,
        dcell: B::DCell,
        machine: B::Machine,
    ) -> Self {
        shared.set_lfd_tolerance(config.probe.lfd_tolerance);
        shared.feed_watchdog(config.timeouts.robot_watchdog_ticks);

        Self {
            robot: RobotPort::new(robot, config.timeouts.robot_watchdog_ticks),
            cnc: CncPeer::new(cnc, config.timeouts.cnc_ticks),
            dcell: DCellPeer::new(dcell, config.timeouts.dcell_ticks),
            machine,
            supervisor: Supervisor::new(),
            dispatcher: Dispatcher::new(),
            mirror: DeviceMirror::new(),
            settings: config.probe,
            relay: Relay::default(),
            sample_due: false,
            sample_tag: 0,
            shared,
            config,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.dispatcher.state()
    }

    pub fn error(&self) -> (ErrorCode, ErrorContext) {
        self.supervisor.error()
    }

    pub fn mirror(&self) -> &DeviceMirror {
        &self.mirror
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    /// Run one loop iteration
    pub fn poll(&mut self) {
        let now = self.shared.now();
        self.service_interrupts();
        self.service_robot(now);
        self.service_cnc(now);
        self.service_dcell(now);
        self.service_supervisor(now);
    }

    // ---- loop phases ----

    fn service_interrupts(&mut self) {
        if self.shared.take_estop_event() {
            self.robot.log(&[b"ISR EStop thrown"]);
            if let Some(task) = self.dispatcher.take() {
                self.wind_down(task);
            }
            self.cnc.cancel();
            self.dcell.cancel();
            self.shared.sample_done();
            self.sample_due = false;

            if self.supervisor.has_error() {
                self.report_status();
            } else {
                self.dispatcher
                    .start(Task::new(TaskCode::EstopDiagnosis, 0));
            }
        }

        if self.shared.take_sample_overlap() {
            self.robot.log(&[b"DCell slow sample"]);
            self.escalate(ErrorCode::NoComms, ErrorContext::DCELL);
        }

        if self.shared.take_sample_request() {
            self.sample_due = true;
        }
    }

    fn service_robot(&mut self, now: u32) {
        if self.relay_active().is_none() {
            match self.robot.poll(self.shared) {
                RobotEvent::Request(request) => self.admit(&request),
                RobotEvent::Overflow => self.robot.log(&[b"Robot line too long"]),
                RobotEvent::Link(_) | RobotEvent::Idle => {}
            }
        }
        self.run_task(now);
    }

    fn service_cnc(&mut self, now: u32) {
        if self.relay_active() == Some(Command::CncPassthrough) {
            return;
        }
        match self.cnc.poll(now) {
            CncEvent::Idle => {}
            CncEvent::Reply(reply) => self.robot.log_value(b"Cnc ", reply.tag, reply.value),
            CncEvent::Error(code) => self.on_cnc_error(code),
            CncEvent::EstopReport(value) => self.on_cnc_estop(value),
            CncEvent::Unexpected(reply) => {
                self.robot.log_value(b"Cnc ignored ", reply.tag, reply.value)
            }
            CncEvent::TimedOut => {
                self.robot.log(&[b"Cnc timeout"]);
                self.escalate(ErrorCode::NoComms, ErrorContext::CNC);
            }
            CncEvent::Overflow => {
                self.robot.log(&[b"Cnc line too long"]);
                self.escalate(ErrorCode::NoComms, ErrorContext::CNC);
            }
            CncEvent::Link(_) => self.robot.log(&[b"Cnc link error"]),
        }
    }

    fn service_dcell(&mut self, now: u32) {
        if self.sample_due
            && !self.dcell.is_awaiting()
            && self
                .dcell
                .send(DCellRequest::force(), DCellPurpose::Sample, now)
                .is_ok()
        {
            self.sample_due = false;
            self.sample_tag = self.shared.sample_index();
        }

        match self.dcell.poll(now) {
            DCellEvent::Idle | DCellEvent::Reply(_) | DCellEvent::Relayed => {}
            DCellEvent::Sample(reply) => self.on_sample(reply),
            DCellEvent::Fault(purpose, _) => {
                if purpose == Some(DCellPurpose::Sample) {
                    self.shared.sample_done();
                }
                self.robot.log(&[b"DCell bad frame"]);
                self.escalate(ErrorCode::NoComms, ErrorContext::DCELL);
            }
            DCellEvent::TimedOut(purpose) => {
                if purpose == DCellPurpose::Sample {
                    self.shared.sample_done();
                }
                self.robot.log(&[b"DCell timeout"]);
                self.escalate(ErrorCode::NoComms, ErrorContext::DCELL);
            }
            DCellEvent::Unexpected => self.robot.log(&[b"DCell ignored frame"]),
            DCellEvent::Link(_) => self.robot.log(&[b"DCell link error"]),
        }
    }

    fn service_supervisor(&mut self, now: u32) {
        if self.relay_active().is_some() {
            // The Robot may sit quietly in a relay
            self.shared
                .feed_watchdog(self.config.timeouts.robot_watchdog_ticks);
        }

        match self.supervisor.evaluate(self.shared) {
            Some(SafetyEvent::LfdTrip) => {
                self.robot.log(&[b"LFD tripped"]);
                self.escalate(ErrorCode::LimitExceeded, ErrorContext::LFD);
            }
            Some(SafetyEvent::WatchdogExpired) => self.on_watchdog(now),
            None => {}
        }
    }

    // ---- arbitration ----

    fn admit(&mut self, request: &RobotRequest) {
        match self.dispatcher.offer(request) {
            Admission::Ping { replaced } => {
                if let Some(task) = replaced {
                    self.wind_down(task);
                }
                self.robot.ping();
            }
            Admission::Started { replaced } => {
                if let Some(task) = replaced {
                    self.wind_down(task);
                }
                self.robot.log(&[b"Setting task to ", &[request.tag]]);
            }
            Admission::Query(Command::GetError) => {
                let (code, context) = self.supervisor.error();
                self.robot.error(code, context);
            }
            Admission::Query(_) => self
                .robot
                .reply_flag(Command::GetEStop.tag(), self.shared.is_estopped()),
            Admission::Busy(tag) => {
                let context = ErrorContext::tag(tag);
                self.supervisor.raise(ErrorCode::Busy, context, self.shared);
                self.robot.error(ErrorCode::Busy, context);
            }
        }
    }

    fn run_task(&mut self, now: u32) {
        let Some(mut task) = self.dispatcher.take() else {
            return;
        };

        if !task.code.always_permitted() {
            let refused = self.shared.is_estopped()
                || (task.step == 0 && self.supervisor.has_error());
            if refused {
                self.wind_down(task);
                self.report_status();
                return;
            }
            if task.step == 0 && task.code.waits_for_rest() && self.machine.is_moving() {
                self.dispatcher.start(task);
                return;
            }
        }

        let mut ctx = TaskContext::<B> {
            now,
            config: &self.config,
            shared: self.shared,
            robot: &mut self.robot,
            cnc: &mut self.cnc,
            dcell: &mut self.dcell,
            machine: &mut self.machine,
            supervisor: &mut self.supervisor,
            mirror: &mut self.mirror,
            settings: &mut self.settings,
            relay: &mut self.relay,
        };
        match task::advance(&mut task, &mut ctx) {
            TaskStatus::Pending => self.dispatcher.start(task),
            TaskStatus::Done => {}
            TaskStatus::Fault(code, context) => {
                self.wind_down(task);
                self.escalate(code, context);
            }
        }
    }

    /// Undo what an abandoned task left behind
    fn wind_down(&mut self, task: Task) {
        self.cnc.cancel();
        if matches!(
            self.dcell.awaiting(),
            Some(DCellPurpose::Query | DCellPurpose::Relay)
        ) {
            self.dcell.cancel();
        }
        match task.code {
            TaskCode::Command(Command::CncPassthrough) => {
                self.shared.set_relay_active(false);
                self.relay.reset();
            }
            TaskCode::Command(Command::DCellPassthrough) => self.relay.reset(),
            TaskCode::Command(Command::DoRefHome) => self.shared.set_homing(false),
            TaskCode::Command(Command::DoProbe) => self.shared.end_probe(),
            _ => {}
        }
    }

    /// The relay command whose raw forwarding is under way
    fn relay_active(&self) -> Option<Command> {
        let task = self.dispatcher.active()?;
        match task.code {
            TaskCode::Command(
                command @ (Command::CncPassthrough | Command::DCellPassthrough),
            ) if task.step > 0 => Some(command),
            _ => None,
        }
    }

    // ---- faults ----

    fn report_status(&mut self) {
        self.robot.report_status(&self.supervisor, self.shared);
    }

    /// Latch estop for `code`, abort the active task and tell the Robot
    ///
    /// The first fault's cause is kept while estop stays latched.
    fn escalate(&mut self, code: ErrorCode, context: ErrorContext) {
        let first = !(self.shared.is_estopped() && self.supervisor.has_error());
        if first {
            self.supervisor
                .fault(code, context, self.shared, &mut self.machine);
            self.robot.log(&[b"EStop thrown"]);
        } else {
            self.machine.assert_estop();
        }

        let aborted = match self.dispatcher.take() {
            Some(task) => {
                self.wind_down(task);
                true
            }
            None => false,
        };
        if first || aborted {
            self.report_status();
        }
    }

    fn on_cnc_error(&mut self, code: CncErrorCode) {
        match code {
            // Stands in for the reply
            CncErrorCode::Constrained | CncErrorCode::None => {}
            CncErrorCode::Axis | CncErrorCode::Command => {
                self.escalate(ErrorCode::Unknown, ErrorContext::CNC)
            }
            CncErrorCode::Eeprom => self.escalate(ErrorCode::HardwareFailure, ErrorContext::CNC),
            CncErrorCode::Hardware => self.escalate(ErrorCode::HardwareFault, ErrorContext::CNC),
            CncErrorCode::Comms => self.escalate(ErrorCode::NoComms, ErrorContext::CNC),
            CncErrorCode::Parameter | CncErrorCode::State => {
                let error = if code == CncErrorCode::Parameter {
                    ErrorCode::BadParameter
                } else {
                    ErrorCode::WrongState
                };
                // The task still gets the reply and carries on
                let active = self.dispatcher.active();
                let context = ErrorContext::tag(active.map_or(b' ', |t| t.code.tag()));
                self.supervisor.raise(error, context, self.shared);
                self.robot.error(error, context);
            }
        }
    }

    fn on_cnc_estop(&mut self, value: i32) {
        self.mirror.motor_estop = value;
        let active = self.dispatcher.active();
        let initialising = active.map(|t| t.code) == Some(TaskCode::Command(Command::Init));
        if value == 0 || initialising {
            return;
        }

        self.robot.log(&[b"Cnc EStop reported"]);
        self.shared.latch_estop();
        if let Some(task) = active.filter(|t| !t.code.always_permitted()) {
            self.dispatcher.take();
            self.wind_down(task);
        }
        self.report_status();
    }

    fn on_sample(&mut self, reply: DCellReply) {
        self.shared.sample_done();
        let DCellReply::Registers(raw) = reply else {
            self.escalate(ErrorCode::NoComms, ErrorContext::DCELL);
            return;
        };

        let force = i32::from(raw.decode());
        match self.supervisor.check_sample(force, &self.settings) {
            SampleVerdict::ForceLimit => {
                self.escalate(ErrorCode::LimitExceeded, ErrorContext::FORCE)
            }
            SampleVerdict::DeltaLimit => {
                self.escalate(ErrorCode::LimitExceeded, ErrorContext::FORCE_DELTA)
            }
            SampleVerdict::Accept => {
                if !self.shared.is_homing() && !self.shared.is_estopped() {
                    self.robot.sample(self.sample_tag, force);
                }
            }
        }
    }

    fn on_watchdog(&mut self, now: u32) {
        self.robot.log(&[b"Robot timeout"]);
        if let Some(task) = self.dispatcher.take() {
            self.wind_down(task);
        }

        if self.settings.safe_disconnect {
            let request = CncRequest::get(CncCommand::RefHome);
            self.cnc.cancel();
            if self
                .cnc
                .send_with_timeout(request, now, self.config.timeouts.home_ticks)
                .is_ok()
            {
                self.shared.set_homing(true);
                self.robot.log(&[b"Safe disconnect: homing"]);
            }
        }

        self.escalate(ErrorCode::NoComms, ErrorContext::CONTROLLER);
    }
}
