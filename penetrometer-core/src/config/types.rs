//! Configuration type definitions
//!
//! Board-agnostic settings for the controller. The firmware fills a
//! [`ControllerConfig`] from its embedded TOML at boot; every field has a
//! working default so a missing or broken file still yields a usable
//! controller.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Lowest force limit the Robot may configure
pub const FORCE_LIMIT_MIN: i32 = -10_000;

/// Highest force limit the Robot may configure
pub const FORCE_LIMIT_MAX: i32 = 10_000;

/// Peer timeouts, in ticks of the supervisor clock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeoutConfig {
    /// CNC reply timeout
    pub cnc_ticks: u32,
    /// DCell reply timeout
    pub dcell_ticks: u32,
    /// Robot silence before the watchdog fires
    pub robot_watchdog_ticks: u32,
    /// Reference-home acknowledgement timeout (covers the homing move)
    pub home_ticks: u32,
    /// Grace period for motion to start after a move is acknowledged
    pub motion_start_ticks: u32,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            cnc_ticks: 100,
            dcell_ticks: 100,
            robot_watchdog_ticks: 3000,
            home_ticks: 60_000,
            motion_start_ticks: 500,
        }
    }
}

/// Probe and force-limit settings
///
/// These start from the configured defaults and are then tuned at runtime
/// by the Robot. Lengths are in tenths of a millimetre (dmm).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProbeSettings {
    /// Position of the ground surface
    pub ground_level: i32,
    /// How far below ground a downward probe travels
    pub probe_depth: i32,
    pub max_force: i32,
    pub min_force: i32,
    pub max_force_delta: i32,
    pub min_force_delta: i32,
    /// Compare the change in magnitude rather than the signed change
    pub force_delta_abs: bool,
    /// Reference-home before latching estop on Robot silence
    pub safe_disconnect: bool,
    /// LFD debounce length in ticks; 0 disables the trip
    pub lfd_tolerance: u8,
    /// Offset the sample index by one step to account for sampling lag
    pub lag_compensation: bool,
    /// Direction of the last completed probe (0 up, 1 down)
    pub probe_state: i32,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            ground_level: 2500,
            probe_depth: 5000,
            max_force: 100,
            min_force: -100,
            max_force_delta: 100,
            min_force_delta: -100,
            force_delta_abs: true,
            safe_disconnect: false,
            lfd_tolerance: 12,
            lag_compensation: true,
            probe_state: 1,
        }
    }
}

/// Bounds applied to Robot parameter writes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ParameterLimits {
    pub steps_per_x_min: i32,
    pub steps_per_x_max: i32,
    pub force_min: i32,
    pub force_max: i32,
}

impl Default for ParameterLimits {
    fn default() -> Self {
        Self {
            steps_per_x_min: 1,
            steps_per_x_max: 100,
            force_min: FORCE_LIMIT_MIN,
            force_max: FORCE_LIMIT_MAX,
        }
    }
}

/// Conversion between CNC steps and Robot units
///
/// Speeds and accelerations travel to the Robot in mm, positions in dmm.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct UnitConfig {
    pub steps_per_mm: i32,
    pub steps_per_dmm: i32,
}

impl Default for UnitConfig {
    fn default() -> Self {
        Self {
            steps_per_mm: 320,
            steps_per_dmm: 32,
        }
    }
}

impl UnitConfig {
    pub fn steps_to_mm(&self, steps: i32) -> i32 {
        steps / self.steps_per_mm.max(1)
    }

    pub fn mm_to_steps(&self, mm: i32) -> i32 {
        mm.saturating_mul(self.steps_per_mm)
    }

    pub fn steps_to_dmm(&self, steps: i32) -> i32 {
        steps / self.steps_per_dmm.max(1)
    }

    pub fn dmm_to_steps(&self, dmm: i32) -> i32 {
        dmm.saturating_mul(self.steps_per_dmm)
    }
}

/// Complete controller configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ControllerConfig {
    pub timeouts: TimeoutConfig,
    pub probe: ProbeSettings,
    pub limits: ParameterLimits,
    pub units: UnitConfig,
}
