//! Commands forwarded to the CNC as a single request
//!
//! Step 0 validates against the mirror and sends; step 1 waits for the
//! acknowledgement, updates the mirror and answers the Robot.

use penetrometer_protocol::{CncCommand, CncErrorCode, CncRequest, Command, ErrorCode};

use super::{Task, TaskCode, TaskContext, TaskStatus};
use crate::traits::Board;

/// CNC request for `command` carrying the Robot's `value`, in CNC units
fn request<B: Board>(
    command: Command,
    value: i32,
    ctx: &TaskContext<'_, B>,
) -> Result<CncRequest, ErrorCode> {
    let units = &ctx.config.units;
    let mirror = &*ctx.mirror;
    let limits = &ctx.config.limits;
    let check = |ok: bool| if ok { Ok(()) } else { Err(ErrorCode::BadParameter) };

    Ok(match command {
        Command::Done => CncRequest::get(CncCommand::Done),
        Command::Save => CncRequest::get(CncCommand::SaveParams),
        Command::GetEnable => CncRequest::get(CncCommand::GetEnable),
        Command::GetHomeState => CncRequest::get(CncCommand::GetHomeState),
        Command::IsRefHomed => CncRequest::get(CncCommand::IsRefHomed),
        Command::SetTopSpeed => {
            check((0..=mirror.speed_max).contains(&value))?;
            CncRequest::new(CncCommand::SetTopSpeed, units.mm_to_steps(value))
        }
        Command::SetSpeed => {
            check((0..=mirror.top_speed).contains(&value))?;
            CncRequest::new(CncCommand::SetSpeed, units.mm_to_steps(value))
        }
        Command::SetHomeSpeed => {
            check((0..=mirror.top_speed).contains(&value))?;
            CncRequest::new(CncCommand::SetHomeSpeed, units.mm_to_steps(value))
        }
        Command::SetAccel => {
            check((0..=mirror.acc_max).contains(&value))?;
            CncRequest::new(CncCommand::SetAccel, units.mm_to_steps(value))
        }
        Command::SetDecel => {
            check((0..=mirror.acc_max).contains(&value))?;
            CncRequest::new(CncCommand::SetDecel, units.mm_to_steps(value))
        }
        Command::SetStepsPerX => {
            check((limits.steps_per_x_min..=limits.steps_per_x_max).contains(&value))?;
            CncRequest::new(CncCommand::SetStepsPerX, units.dmm_to_steps(value))
        }
        Command::SetEnable => CncRequest::new(CncCommand::SetEnable, i32::from(value != 0)),
        _ => return Err(ErrorCode::Unrecognised),
    })
}

pub fn advance<B: Board>(task: &mut Task, ctx: &mut TaskContext<'_, B>) -> TaskStatus {
    let TaskCode::Command(command) = task.code else {
        return TaskStatus::Done;
    };

    match task.step {
        0 => {
            match request(command, task.parameter, ctx) {
                Ok(request) => {
                    if ctx.send_cnc(request) {
                        task.next();
                    }
                }
                Err(code) => return ctx.reject(code, command.tag()),
            }
            TaskStatus::Pending
        }
        _ => {
            let Some(reply) = ctx.cnc.take_reply() else {
                return TaskStatus::Pending;
            };
            // Already reported; the mirror keeps its old value
            if reply.error_code().is_some_and(CncErrorCode::is_rejection) {
                return TaskStatus::Done;
            }
            let value = task.parameter;
            let tag = command.reply_tag();
            let mirror = &mut *ctx.mirror;
            match command {
                Command::Done | Command::Save => ctx.robot.reply(tag, 1),
                Command::GetEnable => {
                    mirror.motor_enable = reply.value;
                    ctx.robot.reply(tag, reply.value);
                }
                Command::GetHomeState => {
                    mirror.home_state = reply.value;
                    ctx.robot.reply(tag, reply.value);
                }
                Command::IsRefHomed => {
                    mirror.is_ref_homed = reply.value;
                    ctx.robot.reply(tag, reply.value);
                }
                setter => {
                    let value = if setter == Command::SetEnable {
                        i32::from(value != 0)
                    } else {
                        value
                    };
                    match setter {
                        Command::SetTopSpeed => mirror.top_speed = value,
                        Command::SetSpeed => mirror.speed = value,
                        Command::SetHomeSpeed => mirror.home_speed = value,
                        Command::SetAccel => mirror.acceleration = value,
                        Command::SetDecel => mirror.deceleration = value,
                        Command::SetStepsPerX => mirror.steps_per_x = value,
                        Command::SetEnable => mirror.motor_enable = value,
                        _ => {}
                    }
                    ctx.robot.reply(tag, value);
                }
            }
            TaskStatus::Done
        }
    }
}
