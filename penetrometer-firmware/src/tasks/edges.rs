//! Edge-triggered inputs
//!
//! The step pulse and the estop chain are serviced here, each in its own
//! task, so the control loop only ever sees their effects through
//! [`SAFETY`].

use defmt::*;
use embassy_rp::gpio::Input;

use crate::channels::{ESTOP_SENSE, SAFETY};

/// Step pulse task - one sample opportunity per rising edge
#[embassy_executor::task]
pub async fn step_pulse_task(mut pin: Input<'static>) {
    info!("Step pulse task started");

    loop {
        pin.wait_for_rising_edge().await;
        SAFETY.on_step_pulse();
    }
}

/// Estop task - tracks the chain and latches on a falling edge
#[embassy_executor::task]
pub async fn estop_task(mut pin: Input<'static>) {
    info!("Estop task started");

    ESTOP_SENSE
        .watch(&mut pin, || {
            warn!("Estop chain pulled active");
            SAFETY.on_estop_edge();
        })
        .await
}
