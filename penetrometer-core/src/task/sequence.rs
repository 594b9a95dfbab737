//! Multi-step command sequences
//!
//! Each step consumes the reply to the previous step's request before it
//! issues the next one, so at most one request per peer is ever in flight.

use penetrometer_protocol::cnc::home_state;
use penetrometer_protocol::{
    CncCommand, CncErrorCode, CncRequest, Command, DCellReply, DCellRequest, ErrorCode,
    ErrorContext,
};

use super::{Task, TaskCode, TaskContext, TaskStatus};
use crate::session::DCellPurpose;
use crate::traits::{Board, MachineIo};

/// CNC queries made by Init after the handshake, in order
const INIT_QUERIES: [CncCommand; 15] = [
    CncCommand::GetHomeState,
    CncCommand::GetTopSpeed,
    CncCommand::GetSpeed,
    CncCommand::GetHomeSpeed,
    CncCommand::GetAccel,
    CncCommand::GetDecel,
    CncCommand::GetPosMin,
    CncCommand::GetPosMax,
    CncCommand::GetStepsPerX,
    CncCommand::GetFault,
    CncCommand::GetEnable,
    CncCommand::GetAccelMax,
    CncCommand::GetSpeedMax,
    CncCommand::IsRefHomed,
    CncCommand::GetEStop,
];

/// Last Init step: stores the final query and replies
const INIT_LAST_STEP: u8 = INIT_QUERIES.len() as u8 + 1;

pub fn advance<B: Board>(task: &mut Task, ctx: &mut TaskContext<'_, B>) -> TaskStatus {
    match task.code {
        TaskCode::Command(Command::Init) => init(task, ctx),
        TaskCode::Command(Command::DoRefHome) => ref_home(task, ctx),
        TaskCode::Command(Command::DoProbe) => probe(task, ctx),
        TaskCode::Command(Command::GetForce) => get_force(task, ctx),
        TaskCode::Command(Command::SetEStop) => set_estop(task, ctx),
        TaskCode::EstopDiagnosis => diagnose(task, ctx),
        _ => TaskStatus::Done,
    }
}

/// Send the next request of a sequence and move on
fn query<B: Board>(task: &mut Task, ctx: &mut TaskContext<'_, B>, request: CncRequest) -> TaskStatus {
    if ctx.send_cnc(request) {
        task.next();
    }
    TaskStatus::Pending
}

/// Ask the DCell for a force reading on behalf of the task
fn read_force<B: Board>(task: &mut Task, ctx: &mut TaskContext<'_, B>) -> TaskStatus {
    if ctx
        .dcell
        .send(DCellRequest::force(), DCellPurpose::Query, ctx.now)
        .is_ok()
    {
        task.next();
    }
    TaskStatus::Pending
}

/// Take a task's force reading; `Err` aborts the task
fn take_force<B: Board>(ctx: &mut TaskContext<'_, B>) -> Option<Result<i32, TaskStatus>> {
    match ctx.dcell.take_reply()? {
        DCellReply::Registers(raw) => Some(Ok(i32::from(raw.decode()))),
        _ => Some(Err(TaskStatus::Fault(ErrorCode::NoComms, ErrorContext::DCELL))),
    }
}

/// True once the axis has come to rest after a move was acknowledged at
/// `mark`; a move that never starts counts as finished after the grace
/// period
fn motion_finished<B: Board>(task: &Task, ctx: &TaskContext<'_, B>) -> bool {
    let Some(mark) = task.mark else {
        return false;
    };
    let started = ctx.shared.started_moving()
        || ctx.now.wrapping_sub(mark) > ctx.config.timeouts.motion_start_ticks;
    started && !ctx.machine.is_moving()
}

fn store_init_reply<B: Board>(command: CncCommand, value: i32, ctx: &mut TaskContext<'_, B>) {
    let units = ctx.config.units;
    let mirror = &mut *ctx.mirror;
    match command {
        CncCommand::GetHomeState => mirror.home_state = value,
        CncCommand::GetTopSpeed => mirror.top_speed = units.steps_to_mm(value),
        CncCommand::GetSpeed => mirror.speed = units.steps_to_mm(value),
        CncCommand::GetHomeSpeed => mirror.home_speed = units.steps_to_mm(value),
        CncCommand::GetAccel => mirror.acceleration = units.steps_to_mm(value),
        CncCommand::GetDecel => mirror.deceleration = units.steps_to_mm(value),
        CncCommand::GetPosMin => mirror.pos_min = units.steps_to_dmm(value),
        CncCommand::GetPosMax => mirror.pos_max = units.steps_to_dmm(value),
        CncCommand::GetStepsPerX => mirror.steps_per_x = units.steps_to_dmm(value),
        CncCommand::GetFault => mirror.motor_fault = value,
        CncCommand::GetEnable => mirror.motor_enable = value,
        CncCommand::GetAccelMax => mirror.acc_max = units.steps_to_mm(value),
        CncCommand::GetSpeedMax => mirror.speed_max = units.steps_to_mm(value),
        CncCommand::IsRefHomed => {
            mirror.is_ref_homed = value;
            if value == 1 {
                ctx.settings.probe_state = 0;
            }
        }
        CncCommand::GetEStop => {
            mirror.motor_estop = value;
            if value != 0 {
                ctx.shared.latch_estop();
                ctx.machine.assert_estop();
            }
        }
        _ => {}
    }
}

/// Handshake with both peers, then refresh the whole mirror
fn init<B: Board>(task: &mut Task, ctx: &mut TaskContext<'_, B>) -> TaskStatus {
    match task.step {
        0 => {
            if ctx.dcell.is_awaiting() {
                return TaskStatus::Pending;
            }
            ctx.shared.set_lfd_tolerance(ctx.settings.lfd_tolerance);
            ctx.shared.reset_sample_index();
            ctx.supervisor.clear_error();
            ctx.cnc.flush();
            if ctx
                .dcell
                .send(DCellRequest::station(), DCellPurpose::Query, ctx.now)
                .is_err()
            {
                return TaskStatus::Pending;
            }
            query(task, ctx, CncRequest::get(CncCommand::Init))
        }
        1 => {
            if ctx.cnc.is_awaiting() || ctx.dcell.is_awaiting() {
                return TaskStatus::Pending;
            }
            if ctx.cnc.take_reply().is_none() || ctx.dcell.take_reply().is_none() {
                return TaskStatus::Pending;
            }
            query(task, ctx, CncRequest::get(INIT_QUERIES[0]))
        }
        step => {
            let Some(reply) = ctx.cnc.take_reply() else {
                return TaskStatus::Pending;
            };
            let answered = usize::from(step) - 2;
            if !reply.error_code().is_some_and(CncErrorCode::is_rejection) {
                store_init_reply(INIT_QUERIES[answered], reply.value, ctx);
            }

            if step == INIT_LAST_STEP {
                ctx.robot.reply(Command::Init.reply_tag(), 1);
                return TaskStatus::Done;
            }
            query(task, ctx, CncRequest::get(INIT_QUERIES[answered + 1]))
        }
    }
}

fn ref_home<B: Board>(task: &mut Task, ctx: &mut TaskContext<'_, B>) -> TaskStatus {
    match task.step {
        0 => {
            ctx.shared.set_homing(true);
            ctx.shared.clear_started_moving();
            let timeout = ctx.config.timeouts.home_ticks;
            if ctx.send_cnc_with_timeout(CncRequest::get(CncCommand::RefHome), timeout) {
                task.next();
            }
            TaskStatus::Pending
        }
        1 => {
            if task.mark.is_none() {
                if ctx.cnc.take_reply().is_none() {
                    return TaskStatus::Pending;
                }
                task.mark = Some(ctx.now);
            }
            if !motion_finished(task, ctx) {
                return TaskStatus::Pending;
            }
            query(task, ctx, CncRequest::get(CncCommand::IsRefHomed))
        }
        2 => {
            let Some(reply) = ctx.cnc.take_reply() else {
                return TaskStatus::Pending;
            };
            ctx.mirror.is_ref_homed = reply.value;
            query(task, ctx, CncRequest::get(CncCommand::GetHomeState))
        }
        _ => {
            let Some(reply) = ctx.cnc.take_reply() else {
                return TaskStatus::Pending;
            };
            ctx.mirror.home_state = reply.value;
            ctx.shared.set_homing(false);
            if ctx.mirror.is_ref_homed == 1 {
                ctx.settings.probe_state = 0;
            }
            ctx.robot
                .reply(Command::DoRefHome.reply_tag(), ctx.mirror.is_ref_homed);
            TaskStatus::Done
        }
    }
}

/// Move down to probe depth (direction 1) or back up to 0 (direction 0)
/// while force samples stream to the Robot
fn probe<B: Board>(task: &mut Task, ctx: &mut TaskContext<'_, B>) -> TaskStatus {
    let down = task.parameter != 0;
    match task.step {
        0 => {
            if ctx.dcell.is_awaiting() {
                return TaskStatus::Pending;
            }
            ctx.shared.set_homing(false);
            ctx.settings.probe_state = 1;
            read_force(task, ctx)
        }
        1 => match take_force(ctx) {
            None => TaskStatus::Pending,
            Some(Err(status)) => status,
            Some(Ok(force)) => {
                ctx.supervisor.set_baseline(force);
                query(task, ctx, CncRequest::get(CncCommand::GetTargetPos))
            }
        },
        2 => {
            let Some(reply) = ctx.cnc.take_reply() else {
                return TaskStatus::Pending;
            };
            let units = ctx.config.units;
            let settings = *ctx.settings;
            let step = ctx.mirror.steps_per_x;

            let mut index = units.steps_to_dmm(reply.value) - settings.ground_level;
            if settings.lag_compensation {
                // The first pulse advances the index before its sample is taken
                index = if down { index - step } else { index + step };
            }
            ctx.shared.begin_probe(down, step, index);

            let target = if down {
                units.dmm_to_steps(settings.ground_level + settings.probe_depth)
            } else {
                0
            };
            query(task, ctx, CncRequest::new(CncCommand::GoTo, target))
        }
        3 => {
            if ctx.cnc.take_reply().is_none() {
                return TaskStatus::Pending;
            }
            task.next();
            task.mark = Some(ctx.now);
            TaskStatus::Pending
        }
        _ => {
            if !motion_finished(task, ctx) || ctx.shared.sample_outstanding() {
                return TaskStatus::Pending;
            }
            ctx.shared.end_probe();
            ctx.settings.probe_state = i32::from(down);
            ctx.robot
                .reply(Command::DoProbe.reply_tag(), ctx.settings.probe_state);
            TaskStatus::Done
        }
    }
}

fn get_force<B: Board>(task: &mut Task, ctx: &mut TaskContext<'_, B>) -> TaskStatus {
    let tag = Command::GetForce.reply_tag();
    match task.step {
        0 => {
            if ctx.machine.is_moving() {
                ctx.robot.reply(tag, ctx.supervisor.current_force());
                return TaskStatus::Done;
            }
            read_force(task, ctx)
        }
        1 => match take_force(ctx) {
            None => TaskStatus::Pending,
            Some(Err(status)) => status,
            // First reading after rest is stale; take another
            Some(Ok(_)) => read_force(task, ctx),
        },
        _ => match take_force(ctx) {
            None => TaskStatus::Pending,
            Some(Err(status)) => status,
            Some(Ok(force)) => {
                ctx.supervisor.record_force(force);
                ctx.robot.reply(tag, force);
                TaskStatus::Done
            }
        },
    }
}

/// `e1` latches estop; `e0` attempts a validated clear
fn set_estop<B: Board>(task: &mut Task, ctx: &mut TaskContext<'_, B>) -> TaskStatus {
    let tag = Command::SetEStop.reply_tag();
    match task.step {
        0 if task.parameter != 0 => {
            ctx.supervisor
                .fault(ErrorCode::Estop, ErrorContext::ESTOP, ctx.shared, &mut *ctx.machine);
            ctx.robot.log(&[b"EStop thrown"]);
            ctx.robot.reply_flag(tag, true);
            TaskStatus::Done
        }
        0 => {
            ctx.machine.release_estop();
            query(task, ctx, CncRequest::new(CncCommand::SetEStop, 0))
        }
        _ => {
            let Some(reply) = ctx.cnc.take_reply() else {
                return TaskStatus::Pending;
            };
            ctx.mirror.motor_estop = reply.value;
            if reply.value != 0 {
                ctx.shared.latch_estop();
                ctx.robot.log(&[b"Cnc EStop is still active"]);
            } else if ctx.machine.estop_input_active() {
                ctx.shared.latch_estop();
                ctx.robot.log(&[b"EStop pin is still active"]);
            } else {
                ctx.shared.clear_estop();
            }
            ctx.robot.reply_flag(tag, ctx.shared.is_estopped());
            TaskStatus::Done
        }
    }
}

/// Find out why the estop chain dropped and report it
fn diagnose<B: Board>(task: &mut Task, ctx: &mut TaskContext<'_, B>) -> TaskStatus {
    match task.step {
        0 => query(task, ctx, CncRequest::get(CncCommand::GetFault)),
        1 => {
            let Some(reply) = ctx.cnc.take_reply() else {
                return TaskStatus::Pending;
            };
            ctx.mirror.motor_fault = reply.value;
            if reply.value != 0 {
                ctx.supervisor
                    .record(ErrorCode::HardwareFault, ErrorContext::MOTOR);
                ctx.report_error_or_estop();
                return TaskStatus::Done;
            }
            query(task, ctx, CncRequest::get(CncCommand::GetHomeState))
        }
        _ => {
            let Some(reply) = ctx.cnc.take_reply() else {
                return TaskStatus::Pending;
            };
            ctx.mirror.home_state = reply.value;
            if home_state::at_limit(reply.value) {
                ctx.supervisor
                    .record(ErrorCode::LimitExceeded, ErrorContext::MOTOR);
            } else {
                ctx.supervisor.record(ErrorCode::Estop, ErrorContext::ESTOP);
            }
            ctx.report_error_or_estop();
            TaskStatus::Done
        }
    }
}
