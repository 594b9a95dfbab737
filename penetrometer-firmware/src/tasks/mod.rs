//! Embassy async tasks
//!
//! The control loop runs in one task; the rest stand in for interrupt
//! handlers and UART drivers and talk to it only through `channels`.

pub mod control;
pub mod edges;
pub mod links;
pub mod tick;

pub use control::control_task;
pub use edges::{estop_task, step_pulse_task};
pub use links::{
    cnc_rx_task, cnc_tx_task, dcell_rx_task, dcell_tx_task, robot_rx_task, robot_tx_task,
};
pub use tick::tick_task;
