//! Machine I/O lines
//!
//! The estop chain is a shared open-collector line: any station can pull
//! it active, and everyone watches it. The controller drives it through
//! its own output and senses it on a separate input, which the estop task
//! owns for edge detection.

use embassy_rp::gpio::{Input, Output};
use portable_atomic::{AtomicBool, Ordering};

use penetrometer_core::MachineIo;

/// Last sensed level of the estop line, kept by the estop task
pub struct EstopSense {
    active: AtomicBool,
}

impl Default for EstopSense {
    fn default() -> Self {
        Self::new()
    }
}

impl EstopSense {
    pub const fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
        }
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    /// Track the line level and call `on_drop` on every active-going edge
    ///
    /// The line is active low.
    pub async fn watch(&self, pin: &mut Input<'static>, on_drop: impl Fn()) -> ! {
        loop {
            let active = pin.is_low();
            self.active.store(active, Ordering::Release);
            if active {
                pin.wait_for_high().await;
            } else {
                pin.wait_for_falling_edge().await;
                self.active.store(true, Ordering::Release);
                on_drop();
            }
        }
    }
}

/// [`MachineIo`] over the board's GPIO
pub struct BoardIo {
    moving: Input<'static>,
    /// High pulls the estop chain active
    estop_drive: Output<'static>,
    estop_sense: &'static EstopSense,
}

impl BoardIo {
    /// Create a new board I/O set with the estop output released
    pub fn new(
        moving: Input<'static>,
        mut estop_drive: Output<'static>,
        estop_sense: &'static EstopSense,
    ) -> Self {
        estop_drive.set_low();
        Self {
            moving,
            estop_drive,
            estop_sense,
        }
    }
}

impl MachineIo for BoardIo {
    fn is_moving(&self) -> bool {
        self.moving.is_high()
    }

    fn assert_estop(&mut self) {
        self.estop_drive.set_high();
    }

    fn release_estop(&mut self) {
        self.estop_drive.set_low();
    }

    fn estop_input_active(&self) -> bool {
        self.estop_sense.is_active()
    }
}
