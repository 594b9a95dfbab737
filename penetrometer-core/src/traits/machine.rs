//! Discrete machine signals

/// Digital I/O shared with the CNC and the estop chain
pub trait MachineIo {
    /// CNC motion-in-progress signal
    fn is_moving(&self) -> bool;

    /// Drive the estop line active
    fn assert_estop(&mut self);

    /// Stop driving the estop line
    fn release_estop(&mut self);

    /// Estop line sensed active (by anyone on the chain)
    fn estop_input_active(&self) -> bool;
}
