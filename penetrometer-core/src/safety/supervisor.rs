//! Fault recording and force supervision
//!
//! The supervisor owns the sticky error, latches estop on faults and judges
//! every force sample against the configured limits. It does not talk to
//! any peer itself; the controller carries out the reporting.

use penetrometer_protocol::{ErrorCode, ErrorContext};

use super::shared::SharedSafetyState;
use crate::config::ProbeSettings;
use crate::traits::MachineIo;

/// Overall safety state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SafetyStatus {
    Normal,
    Estopped,
}

/// Outcome of checking a force sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleVerdict {
    Accept,
    /// Force outside `[min_force, max_force]`
    ForceLimit,
    /// Change since the previous sample outside the delta limits
    DeltaLimit,
}

/// Condition found when evaluating the shared state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SafetyEvent {
    /// LFD debounce ran out
    LfdTrip,
    /// Robot silent past the watchdog timeout
    WatchdogExpired,
}

/// Sticky error plus force history
#[derive(Debug, Clone, Default)]
pub struct Supervisor {
    error: ErrorCode,
    context: ErrorContext,
    current_force: i32,
    last_force: i32,
}

impl Supervisor {
    /// Create a supervisor with no error recorded
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self, shared: &SharedSafetyState) -> SafetyStatus {
        if shared.is_estopped() {
            SafetyStatus::Estopped
        } else {
            SafetyStatus::Normal
        }
    }

    pub fn error(&self) -> (ErrorCode, ErrorContext) {
        (self.error, self.context)
    }

    pub fn has_error(&self) -> bool {
        !self.error.is_none()
    }

    /// Record an error without touching estop
    ///
    /// A fault already recorded under a latched estop is kept so the cause
    /// of the stop is not overwritten by a later refusal.
    pub fn raise(&mut self, code: ErrorCode, context: ErrorContext, shared: &SharedSafetyState) {
        if shared.is_estopped() && self.has_error() {
            return;
        }
        self.error = code;
        self.context = context;
    }

    /// Record a fault, latch estop and drive the estop output
    pub fn fault<M: MachineIo>(
        &mut self,
        code: ErrorCode,
        context: ErrorContext,
        shared: &SharedSafetyState,
        machine: &mut M,
    ) {
        self.error = code;
        self.context = context;
        shared.latch_estop();
        machine.assert_estop();
    }

    /// Set the error without latching (diagnosis of an external estop)
    pub fn record(&mut self, code: ErrorCode, context: ErrorContext) {
        self.error = code;
        self.context = context;
    }

    pub fn clear_error(&mut self) {
        self.error = ErrorCode::None;
        self.context = ErrorContext::NONE;
    }

    pub fn current_force(&self) -> i32 {
        self.current_force
    }

    /// Take `force` as the reference for the next delta check
    pub fn set_baseline(&mut self, force: i32) {
        self.current_force = force;
        self.last_force = force;
    }

    /// Store a reading taken outside of sampling
    pub fn record_force(&mut self, force: i32) {
        self.last_force = self.current_force;
        self.current_force = force;
    }

    /// Store a streamed sample and judge it against the limits
    pub fn check_sample(&mut self, force: i32, settings: &ProbeSettings) -> SampleVerdict {
        self.record_force(force);

        if force > settings.max_force || force < settings.min_force {
            return SampleVerdict::ForceLimit;
        }

        let delta = if settings.force_delta_abs {
            self.current_force.abs() - self.last_force.abs()
        } else {
            self.current_force - self.last_force
        };
        if delta > settings.max_force_delta || delta < settings.min_force_delta {
            return SampleVerdict::DeltaLimit;
        }

        SampleVerdict::Accept
    }

    /// Poll the interrupt-maintained conditions
    ///
    /// The LFD trip is reported once per debounce expiry.
    pub fn evaluate(&self, shared: &SharedSafetyState) -> Option<SafetyEvent> {
        if shared.take_lfd_trip() {
            return Some(SafetyEvent::LfdTrip);
        }
        if shared.take_watchdog_expired() {
            return Some(SafetyEvent::WatchdogExpired);
        }
        None
    }
}
