//! Control loop task
//!
//! Owns the [`Controller`] and polls it continuously. `poll` never awaits,
//! so the task yields between iterations to let the pumps and edge tasks
//! run.

use defmt::*;
use embassy_futures::yield_now;

use penetrometer_core::config::ControllerConfig;
use penetrometer_core::dispatcher::DispatchState;
use penetrometer_core::Controller;
use penetrometer_hal_rp2040::{BoardIo, PipeLink};
use penetrometer_protocol::ErrorCode;

use crate::board::Penetrometer;
use crate::channels::SAFETY;

/// Controller task - the cooperative loop
#[embassy_executor::task]
pub async fn control_task(
    config: ControllerConfig,
    robot: PipeLink,
    cnc: PipeLink,
    dcell: PipeLink,
    machine: BoardIo,
) {
    info!("Controller task started");

    let mut controller =
        Controller::<Penetrometer>::new(config, &SAFETY, robot, cnc, dcell, machine);

    let mut running = None;
    let mut error = ErrorCode::None;

    loop {
        controller.poll();

        let task = match controller.state() {
            DispatchState::Idle => None,
            DispatchState::Running(task) => Some(task.code),
        };
        if task != running {
            match task {
                Some(code) => debug!("Task {:?} started", code),
                None => debug!("Task {:?} finished", running),
            }
            running = task;
        }

        let (code, context) = controller.error();
        if code != error {
            if code.is_none() {
                info!("Error cleared");
            } else {
                warn!("Error {:?} in context {:?}", code, context);
            }
            error = code;
        }

        yield_now().await;
    }
}
