//! Raw relay between the Robot and one peer
//!
//! While a relay runs the Robot talks to the CNC or DCell directly; the
//! controller stops assembling Robot lines and, for the CNC relay, ignores
//! step pulses.

use heapless::Vec;
use penetrometer_protocol::dcell::{self, PASSTHROUGH_EXIT, WRITE_REQUEST_LEN};
use penetrometer_protocol::{cnc, Command, ErrorCode, ErrorContext};

use super::{Task, TaskCode, TaskContext, TaskStatus};
use crate::session::DCellPurpose;
use crate::traits::{Board, ByteLink};

/// Byte the Robot repeats to leave the CNC relay
const CNC_EXIT_BYTE: u8 = b'*';

/// How many consecutive exit bytes end the CNC relay
const CNC_EXIT_RUN: u8 = 5;

/// Progress of the active relay
#[derive(Debug, Clone, Default)]
pub struct Relay {
    exit_run: u8,
    request: Vec<u8, WRITE_REQUEST_LEN>,
    expected: Option<usize>,
}

impl Relay {
    pub fn reset(&mut self) {
        self.exit_run = 0;
        self.request.clear();
        self.expected = None;
    }
}

pub fn advance<B: Board>(task: &mut Task, ctx: &mut TaskContext<'_, B>) -> TaskStatus {
    match task.code {
        TaskCode::Command(Command::CncPassthrough) => cnc_relay(task, ctx),
        TaskCode::Command(Command::DCellPassthrough) => dcell_relay(task, ctx),
        _ => TaskStatus::Done,
    }
}

fn cnc_relay<B: Board>(task: &mut Task, ctx: &mut TaskContext<'_, B>) -> TaskStatus {
    if task.step == 0 {
        ctx.robot.log(&[b"In CncPassthrough"]);
        ctx.shared.set_relay_active(true);
        ctx.relay.reset();
        ctx.cnc.cancel();
        ctx.robot.reset_line();
        task.next();
        return TaskStatus::Pending;
    }

    while let Ok(Some(byte)) = ctx.cnc.link_mut().try_read() {
        ctx.robot.write_raw(&[byte]);
    }

    while let Some(byte) = ctx.robot.read_raw(ctx.shared) {
        ctx.cnc.link_mut().write(&[byte]);
        if byte != CNC_EXIT_BYTE {
            ctx.relay.exit_run = 0;
            continue;
        }
        ctx.relay.exit_run += 1;
        if ctx.relay.exit_run >= CNC_EXIT_RUN {
            ctx.cnc.link_mut().write(cnc::LINE_END);
            ctx.cnc.flush();
            ctx.shared.set_relay_active(false);
            ctx.relay.reset();
            return TaskStatus::Done;
        }
    }
    TaskStatus::Pending
}

fn dcell_relay<B: Board>(task: &mut Task, ctx: &mut TaskContext<'_, B>) -> TaskStatus {
    match task.step {
        0 => {
            ctx.robot.log(&[b"In DCellPassthrough"]);
            ctx.relay.reset();
            ctx.robot.reset_line();
            task.next();
            TaskStatus::Pending
        }
        // Collect one request from the Robot
        1 => {
            while let Some(byte) = ctx.robot.read_raw(ctx.shared) {
                let relay = &mut *ctx.relay;
                if relay.request.push(byte).is_err() {
                    return TaskStatus::Fault(ErrorCode::NoComms, ErrorContext::CONTROLLER);
                }
                if relay.request.len() == 2 {
                    match dcell::request_len(byte) {
                        Some(len) => relay.expected = Some(len),
                        None => {
                            return TaskStatus::Fault(ErrorCode::NoComms, ErrorContext::CONTROLLER)
                        }
                    }
                }
                if relay.expected == Some(relay.request.len()) {
                    if relay.request[1] == PASSTHROUGH_EXIT {
                        relay.reset();
                        return TaskStatus::Done;
                    }
                    task.next();
                    break;
                }
            }
            TaskStatus::Pending
        }
        // Forward it once the DCell is free
        2 => {
            if ctx.dcell.is_awaiting() {
                return TaskStatus::Pending;
            }
            if ctx
                .dcell
                .send_raw(&ctx.relay.request, DCellPurpose::Relay, ctx.now)
                .is_ok()
            {
                task.next();
            }
            TaskStatus::Pending
        }
        // Hand the response back
        _ => {
            if let Some(frame) = ctx.dcell.take_relay() {
                ctx.robot.write_raw(&frame);
                ctx.relay.reset();
                task.step = 1;
            }
            TaskStatus::Pending
        }
    }
}
