//! Commands answered from local state

use penetrometer_protocol::{Command, ErrorCode};

use super::{Task, TaskCode, TaskContext, TaskStatus};
use crate::traits::Board;

pub fn advance<B: Board>(task: &mut Task, ctx: &mut TaskContext<'_, B>) -> TaskStatus {
    let command = match task.code {
        TaskCode::Command(command) => command,
        TaskCode::Unrecognised(tag) => return ctx.reject(ErrorCode::Unrecognised, tag),
        TaskCode::EstopDiagnosis => return TaskStatus::Done,
    };
    let value = task.parameter;
    let tag = command.reply_tag();

    use Command::*;
    match command {
        // The ping itself was answered on arrival
        None => {}
        Log => {
            let on = !ctx.robot.logging();
            ctx.robot.set_logging(on);
            ctx.robot.reply_flag(tag, on);
        }
        GetEStop => ctx.robot.reply_flag(tag, ctx.shared.is_estopped()),
        GetError => {
            let (code, context) = ctx.supervisor.error();
            ctx.robot.error(code, context);
        }
        ClearError => {
            ctx.supervisor.clear_error();
            let (code, context) = ctx.supervisor.error();
            ctx.robot.error(code, context);
        }

        GetGroundLevel => ctx.robot.reply(tag, ctx.settings.ground_level),
        GetProbeDepth => ctx.robot.reply(tag, ctx.settings.probe_depth),
        GetLfdTolerance => ctx.robot.reply(tag, i32::from(ctx.settings.lfd_tolerance)),
        GetMaxForce => ctx.robot.reply(tag, ctx.settings.max_force),
        GetMinForce => ctx.robot.reply(tag, ctx.settings.min_force),
        GetMaxForceDelta => ctx.robot.reply(tag, ctx.settings.max_force_delta),
        GetMinForceDelta => ctx.robot.reply(tag, ctx.settings.min_force_delta),
        GetForceDeltaAbs => ctx.robot.reply_flag(tag, ctx.settings.force_delta_abs),
        GetSafeDisconnect => ctx.robot.reply_flag(tag, ctx.settings.safe_disconnect),
        GetLfdState => ctx.robot.reply_flag(tag, ctx.shared.lfd_tripped()),
        GetProbeState => ctx.robot.reply(tag, ctx.settings.probe_state),
        GetTopSpeed => ctx.robot.reply(tag, ctx.mirror.top_speed),
        GetSpeed => ctx.robot.reply(tag, ctx.mirror.speed),
        GetHomeSpeed => ctx.robot.reply(tag, ctx.mirror.home_speed),
        GetAccel => ctx.robot.reply(tag, ctx.mirror.acceleration),
        GetDecel => ctx.robot.reply(tag, ctx.mirror.deceleration),
        GetStepsPerX => ctx.robot.reply(tag, ctx.mirror.steps_per_x),

        SetGroundLevel => {
            if !ctx.mirror.within_travel(value.saturating_add(ctx.settings.probe_depth)) {
                return ctx.reject(ErrorCode::BadParameter, command.tag());
            }
            ctx.settings.ground_level = value;
            ctx.robot.reply(tag, value);
        }
        SetProbeDepth => {
            if !ctx.mirror.within_travel(value.saturating_add(ctx.settings.ground_level)) {
                return ctx.reject(ErrorCode::BadParameter, command.tag());
            }
            ctx.settings.probe_depth = value;
            ctx.robot.reply(tag, value);
        }
        SetLfdTolerance => {
            let Ok(tolerance) = u8::try_from(value) else {
                return ctx.reject(ErrorCode::BadParameter, command.tag());
            };
            ctx.settings.lfd_tolerance = tolerance;
            ctx.shared.set_lfd_tolerance(tolerance);
            ctx.robot.reply(tag, value);
        }
        SetMaxForce => {
            if value > ctx.config.limits.force_max || value < ctx.settings.min_force {
                return ctx.reject(ErrorCode::BadParameter, command.tag());
            }
            ctx.settings.max_force = value;
            ctx.robot.reply(tag, value);
        }
        SetMinForce => {
            if value < ctx.config.limits.force_min || value > ctx.settings.max_force {
                return ctx.reject(ErrorCode::BadParameter, command.tag());
            }
            ctx.settings.min_force = value;
            ctx.robot.reply(tag, value);
        }
        SetMaxForceDelta => {
            if value > ctx.config.limits.force_max || value < ctx.settings.min_force_delta {
                return ctx.reject(ErrorCode::BadParameter, command.tag());
            }
            ctx.settings.max_force_delta = value;
            ctx.robot.reply(tag, value);
        }
        SetMinForceDelta => {
            if value < ctx.config.limits.force_min || value > ctx.settings.max_force_delta {
                return ctx.reject(ErrorCode::BadParameter, command.tag());
            }
            ctx.settings.min_force_delta = value;
            ctx.robot.reply(tag, value);
        }
        SetForceDeltaAbs => {
            ctx.settings.force_delta_abs = value != 0;
            ctx.robot.reply_flag(tag, value != 0);
        }
        SetSafeDisconnect => {
            ctx.settings.safe_disconnect = value != 0;
            ctx.robot.reply_flag(tag, value != 0);
        }

        // Routed elsewhere by family
        _ => return ctx.reject(ErrorCode::Unrecognised, command.tag()),
    }
    TaskStatus::Done
}
