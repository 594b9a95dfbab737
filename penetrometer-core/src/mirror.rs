//! Cached CNC parameters
//!
//! The controller keeps a copy of the motion controller's settings so Robot
//! queries are answered locally and setter requests can be validated before
//! they reach the CNC. Values are stored in Robot units: speeds and
//! accelerations in mm, positions in dmm.

/// Last known CNC state, refreshed by Init and by every acknowledged setter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceMirror {
    pub home_state: i32,
    pub top_speed: i32,
    pub speed: i32,
    pub home_speed: i32,
    pub acceleration: i32,
    pub deceleration: i32,
    pub pos_min: i32,
    pub pos_max: i32,
    pub steps_per_x: i32,
    pub motor_fault: i32,
    pub motor_enable: i32,
    pub acc_max: i32,
    pub speed_max: i32,
    pub is_ref_homed: i32,
    pub motor_estop: i32,
}

impl DeviceMirror {
    /// Create an empty mirror; everything reads 0 until Init runs
    pub const fn new() -> Self {
        Self {
            home_state: 0,
            top_speed: 0,
            speed: 0,
            home_speed: 0,
            acceleration: 0,
            deceleration: 0,
            pos_min: 0,
            pos_max: 0,
            steps_per_x: 0,
            motor_fault: 0,
            motor_enable: 0,
            acc_max: 0,
            speed_max: 0,
            is_ref_homed: 0,
            motor_estop: 0,
        }
    }

    /// True if `position` (dmm) lies within the CNC travel limits
    pub fn within_travel(&self, position: i32) -> bool {
        (self.pos_min..=self.pos_max).contains(&position)
    }
}
