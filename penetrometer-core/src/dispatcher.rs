//! Robot command arbitration
//!
//! One task runs at a time. A new request is accepted when idle; a ping or
//! an estop request replaces whatever is running. Error and estop queries
//! are answered on the spot without disturbing the running task; anything
//! else arriving while busy is refused.

use penetrometer_protocol::{Command, RobotRequest};

use crate::task::{Task, TaskCode};

/// Dispatcher state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DispatchState {
    Idle,
    Running(Task),
}

/// What to do with a freshly received request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Admission {
    /// Started as the new task; `replaced` is the task it cancelled
    Started { replaced: Option<Task> },
    /// Ping: answer at once; `replaced` is the task it cancelled
    Ping { replaced: Option<Task> },
    /// Answer from current state without touching the running task
    Query(Command),
    /// Refuse with `busy`
    Busy(u8),
}

#[derive(Debug, Clone)]
pub struct Dispatcher {
    state: DispatchState,
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl Dispatcher {
    /// Create an idle dispatcher
    pub const fn new() -> Self {
        Self {
            state: DispatchState::Idle,
        }
    }

    pub fn state(&self) -> DispatchState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == DispatchState::Idle
    }

    pub fn active(&self) -> Option<Task> {
        match self.state {
            DispatchState::Running(task) => Some(task),
            DispatchState::Idle => None,
        }
    }

    /// Decide what happens to `request`
    pub fn offer(&mut self, request: &RobotRequest) -> Admission {
        let code = TaskCode::from_request(request);
        match code {
            TaskCode::Command(Command::None) => Admission::Ping {
                replaced: self.take(),
            },
            _ if self.is_idle() || code == TaskCode::Command(Command::SetEStop) => {
                let replaced = self.take();
                self.start(Task::new(code, request.parameter));
                Admission::Started { replaced }
            }
            TaskCode::Command(query @ (Command::GetError | Command::GetEStop)) => {
                Admission::Query(query)
            }
            _ => Admission::Busy(request.tag),
        }
    }

    /// Run `task` next, replacing anything active
    pub fn start(&mut self, task: Task) {
        self.state = DispatchState::Running(task);
    }

    /// Remove the active task, leaving the dispatcher idle
    pub fn take(&mut self) -> Option<Task> {
        match core::mem::replace(&mut self.state, DispatchState::Idle) {
            DispatchState::Running(task) => Some(task),
            DispatchState::Idle => None,
        }
    }
}
