//! State shared between tasks
//!
//! Everything here is a `static` so the edge and tick tasks can reach it
//! without going through the control loop.

use penetrometer_core::safety::SharedSafetyState;
use penetrometer_hal_rp2040::{EstopSense, LinkBuffers};

/// Tick clock, edge latches and counters fed by the tick, step and estop tasks
pub static SAFETY: SharedSafetyState = SharedSafetyState::new();

/// Sensed level of the estop chain
pub static ESTOP_SENSE: EstopSense = EstopSense::new();

/// Robot link buffers (UART0)
pub static ROBOT_LINK: LinkBuffers = LinkBuffers::new();

/// CNC link buffers (UART1)
pub static CNC_LINK: LinkBuffers = LinkBuffers::new();

/// DCell link buffers (PIO0 UART)
pub static DCELL_LINK: LinkBuffers = LinkBuffers::new();
