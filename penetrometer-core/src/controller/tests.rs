use std::boxed::Box;
use std::string::String;
use std::vec::Vec;

use penetrometer_protocol::{append_crc, RawForce};
use proptest::prelude::*;

use super::*;
use crate::testing::{MockBoard, MockLink, MockMachine};

const FORCE_0: [u8; 4] = [0x00, 0x00, 0x00, 0x00];
const FORCE_50: [u8; 4] = [0x00, 0x00, 0x42, 0x48];
const FORCE_150: [u8; 4] = [0x00, 0x00, 0x43, 0x16];

fn force_frame(data: [u8; 4]) -> [u8; 9] {
    let mut frame = [0x01, 0x03, 0x04, data[0], data[1], data[2], data[3], 0, 0];
    append_crc(&mut frame);
    frame
}

/// Controller wired to a simulated CNC and DCell
struct Rig {
    shared: &'static SharedSafetyState,
    controller: Controller<'static, MockBoard>,
    robot: MockLink,
    cnc: MockLink,
    dcell: MockLink,
    machine: MockMachine,
    /// Everything the Robot received
    robot_rx: Vec<u8>,
    /// Lines the CNC received while answering automatically
    cnc_log: Vec<String>,
    dcell_requests: Vec<Vec<u8>>,
    cnc_auto: bool,
    dcell_auto: bool,
    /// Replaces the CNC's next answer
    cnc_override: Option<&'static [u8]>,
    force: [u8; 4],
    home_state: i32,
}

impl Rig {
    fn new(config: ControllerConfig) -> Self {
        let shared: &'static SharedSafetyState = Box::leak(Box::new(SharedSafetyState::new()));
        let robot = MockLink::default();
        let cnc = MockLink::default();
        let dcell = MockLink::default();
        let machine = MockMachine::default();
        let controller = Controller::new(
            config,
            shared,
            robot.clone(),
            cnc.clone(),
            dcell.clone(),
            machine.clone(),
        );
        Self {
            shared,
            controller,
            robot,
            cnc,
            dcell,
            machine,
            robot_rx: Vec::new(),
            cnc_log: Vec::new(),
            dcell_requests: Vec::new(),
            cnc_auto: true,
            dcell_auto: true,
            cnc_override: None,
            force: FORCE_0,
            home_state: 5,
        }
    }

    /// A controller that has completed Init
    fn initialised() -> Self {
        let mut rig = Self::new(ControllerConfig::default());
        rig.send(b"@0\n");
        rig.cycle(60);
        assert_eq!(rig.lines(), ["@1"]);
        rig.clear();
        rig
    }

    fn clear(&mut self) {
        self.robot_rx.clear();
        self.cnc_log.clear();
        self.dcell_requests.clear();
    }

    fn send(&self, bytes: &[u8]) {
        self.robot.push_rx(bytes);
    }

    fn tick(&self, ticks: u32) {
        for _ in 0..ticks {
            self.shared.on_tick(true);
        }
    }

    fn lines(&self) -> Vec<String> {
        String::from_utf8_lossy(&self.robot_rx)
            .split('\n')
            .filter(|line| !line.is_empty())
            .map(String::from)
            .collect()
    }

    fn last_line(&self) -> Option<String> {
        self.lines().pop()
    }

    fn cnc_answer(&self, line: &str) -> String {
        let tag = line.chars().next().unwrap_or(' ');
        let upper = tag.to_ascii_uppercase();
        let value = match upper {
            '@' | '~' | '^' => return format!("{upper}\r\n"),
            'G' if tag == 'g' => line[2..].parse().unwrap(),
            'G' => 80_000,
            'H' => self.home_state,
            'T' => 64_000,
            'S' => 32_000,
            'K' => 16_000,
            'A' | 'D' => 6_400,
            'L' => 0,
            'U' => 240_000,
            'Q' => 320,
            'F' => 0,
            'P' => 1,
            'Y' => 32_000,
            'M' => 96_000,
            'Z' => 1,
            'E' => 0,
            _ => 0,
        };
        format!("{upper}X{value}\r\n")
    }

    fn cycle(&mut self, polls: usize) {
        for _ in 0..polls {
            self.controller.poll();
            self.robot_rx.extend(self.robot.take_tx());

            if self.cnc_auto {
                for line in self.cnc.take_lines() {
                    match self.cnc_override.take() {
                        Some(answer) => self.cnc.push_rx(answer),
                        None => self.cnc.push_rx(self.cnc_answer(&line).as_bytes()),
                    }
                    self.cnc_log.push(line);
                }
            }

            if self.dcell_auto {
                let request = self.dcell.take_tx();
                if !request.is_empty() {
                    self.dcell.push_rx(&force_frame(self.force));
                    self.dcell_requests.push(request);
                }
            }
        }
    }
}

#[test]
fn test_force_constants() {
    assert_eq!(RawForce::new(FORCE_0).decode(), 0);
    assert_eq!(RawForce::new(FORCE_50).decode(), 50);
    assert_eq!(RawForce::new(FORCE_150).decode(), 150);
}

#[test]
fn test_init_synchronises_mirror() {
    let mut rig = Rig::new(ControllerConfig::default());
    rig.send(b"@0\n");
    rig.cycle(60);

    assert_eq!(rig.controller.state(), DispatchState::Idle);
    assert_eq!(rig.last_line().as_deref(), Some("@1"));
    assert_eq!(rig.cnc_log.len(), 16);
    assert_eq!(rig.cnc_log[0], "@CNC");
    assert_eq!(rig.cnc_log[1], "HX");
    assert_eq!(rig.cnc_log[15], "E ");
    assert_eq!(rig.dcell_requests.len(), 1);

    let mirror = rig.controller.mirror();
    assert_eq!(mirror.home_state, 5);
    assert_eq!(mirror.top_speed, 200);
    assert_eq!(mirror.speed, 100);
    assert_eq!(mirror.home_speed, 50);
    assert_eq!(mirror.acceleration, 20);
    assert_eq!(mirror.pos_min, 0);
    assert_eq!(mirror.pos_max, 7500);
    assert_eq!(mirror.steps_per_x, 10);
    assert_eq!(mirror.acc_max, 100);
    assert_eq!(mirror.speed_max, 300);
    assert_eq!(mirror.is_ref_homed, 1);
    assert_eq!(rig.controller.settings().probe_state, 0);
    assert!(!rig.shared.is_estopped());
}

#[test]
fn test_init_latches_cnc_estop() {
    let mut rig = Rig::new(ControllerConfig::default());
    rig.send(b"@0\n");
    // Answer every query normally except the final estop read
    rig.cycle(1);
    for _ in 0..60 {
        if rig.cnc_log.len() == 15 {
            rig.cnc_override = Some(b"E 1\r\n");
        }
        rig.cycle(1);
    }
    assert_eq!(rig.last_line().as_deref(), Some("@1"));
    assert!(rig.shared.is_estopped());
    assert_eq!(rig.controller.mirror().motor_estop, 1);

    // Refused with the estop state while latched
    rig.clear();
    rig.send(b"z\n");
    rig.cycle(2);
    assert_eq!(rig.lines(), ["E1"]);
}

#[test]
fn test_probe_force_limit_stops_everything() {
    let mut rig = Rig::initialised();
    rig.send(b"!1\n");
    rig.cycle(12);
    // Ground 2500 + depth 5000 dmm, at 32 steps per dmm
    assert_eq!(rig.cnc_log, ["GX", "gX240000"]);

    rig.machine.set_moving(true);
    rig.force = FORCE_50;
    rig.shared.on_step_pulse();
    rig.cycle(3);
    assert_eq!(rig.last_line().as_deref(), Some("*0,50"));

    rig.force = FORCE_150;
    rig.shared.on_step_pulse();
    rig.cycle(3);
    assert_eq!(rig.last_line().as_deref(), Some("F6f"));
    assert!(rig.machine.estop_driven());
    assert_eq!(
        rig.controller.error(),
        (ErrorCode::LimitExceeded, ErrorContext::FORCE)
    );
    assert_eq!(rig.controller.state(), DispatchState::Idle);

    // The axis coasts on: no telemetry, no further commands, no new reports
    let reported = rig.lines().len();
    rig.cnc_log.clear();
    rig.force = FORCE_50;
    for _ in 0..3 {
        rig.shared.on_step_pulse();
        rig.cycle(3);
    }
    assert_eq!(rig.lines().len(), reported);
    assert!(rig.cnc_log.is_empty());
}

#[test]
fn test_probe_completes() {
    let mut rig = Rig::initialised();
    rig.send(b"!1\n");
    rig.cycle(12);
    rig.machine.set_moving(true);
    rig.force = FORCE_50;
    for _ in 0..3 {
        rig.shared.on_step_pulse();
        rig.cycle(3);
    }
    rig.machine.set_moving(false);
    rig.cycle(2);

    assert_eq!(rig.lines(), ["*0,50", "*10,50", "*20,50", "!1"]);
    assert_eq!(rig.controller.settings().probe_state, 1);
    assert_eq!(rig.controller.state(), DispatchState::Idle);
}

#[test]
fn test_delta_limit() {
    let mut rig = Rig::initialised();
    rig.send(b"m1000\n");
    rig.cycle(2);
    rig.send(b"!1\n");
    rig.cycle(12);
    rig.machine.set_moving(true);
    rig.force = FORCE_150;
    rig.shared.on_step_pulse();
    rig.cycle(3);
    assert_eq!(rig.last_line().as_deref(), Some("F6d"));
}

#[test]
fn test_watchdog_with_safe_disconnect_homes_first() {
    let mut rig = Rig::initialised();
    rig.send(b"o1\n");
    rig.cycle(2);
    assert_eq!(rig.lines(), ["O1"]);
    rig.clear();

    rig.tick(3001);
    rig.cycle(2);
    assert_eq!(rig.cnc_log, ["zX"]);
    assert!(rig.shared.is_estopped());
    assert!(rig.machine.estop_driven());
    assert_eq!(
        rig.controller.error(),
        (ErrorCode::NoComms, ErrorContext::CONTROLLER)
    );
    assert_eq!(rig.last_line().as_deref(), Some("F9a"));
}

#[test]
fn test_watchdog_without_safe_disconnect() {
    let mut rig = Rig::initialised();
    rig.tick(3001);
    rig.cycle(2);
    assert!(rig.cnc_log.is_empty());
    assert!(rig.shared.is_estopped());
    assert_eq!(rig.lines(), ["F9a"]);
}

#[test]
fn test_robot_traffic_feeds_watchdog() {
    let mut rig = Rig::initialised();
    for _ in 0..4 {
        rig.tick(2000);
        rig.send(b"G\n");
        rig.cycle(2);
    }
    assert!(!rig.shared.is_estopped());
    assert_eq!(rig.lines(), ["G2500", "G2500", "G2500", "G2500"]);
}

#[test]
fn test_fault_recovery_needs_clear_and_estop_release() {
    let mut rig = Rig::initialised();
    rig.tick(3001);
    rig.cycle(2);
    rig.clear();

    // Gated while the error is recorded and estop latched
    rig.send(b"g100\n");
    rig.cycle(2);
    assert_eq!(rig.lines(), ["F9a"]);

    rig.send(b"f\n");
    rig.cycle(2);
    rig.send(b"G\n");
    rig.cycle(2);
    assert_eq!(rig.lines(), ["F9a", "F0 ", "E1"]);

    rig.clear();
    rig.send(b"e0\n");
    rig.cycle(4);
    assert_eq!(rig.lines(), ["E0"]);
    assert_eq!(rig.cnc_log, ["e0"]);
    assert!(!rig.machine.estop_driven());

    rig.clear();
    rig.send(b"G\n");
    rig.cycle(2);
    assert_eq!(rig.lines(), ["G2500"]);
}

#[test]
fn test_clear_refused_while_cnc_in_estop() {
    let mut rig = Rig::initialised();
    rig.send(b"e1\n");
    rig.cycle(2);
    assert_eq!(rig.lines(), ["E1"]);
    assert_eq!(rig.controller.error(), (ErrorCode::Estop, ErrorContext::ESTOP));

    rig.clear();
    rig.cnc_override = Some(b"E 1\r\n");
    rig.send(b"e0\n");
    rig.cycle(4);
    assert_eq!(rig.lines(), ["E1"]);
    assert!(rig.shared.is_estopped());
}

#[test]
fn test_clear_refused_while_estop_input_active() {
    let mut rig = Rig::initialised();
    rig.send(b"e1\n");
    rig.cycle(2);
    rig.clear();

    rig.machine.set_estop_input(true);
    rig.send(b"#\n");
    rig.cycle(2);
    rig.send(b"e0\n");
    rig.cycle(4);
    let lines = rig.lines();
    assert!(lines.iter().any(|l| l == "# EStop pin is still active"));
    assert_eq!(lines.last().map(String::as_str), Some("E1"));
}

#[test]
fn test_busy_and_queries_while_running() {
    let mut rig = Rig::initialised();
    rig.cnc_auto = false;
    rig.send(b"z\n");
    rig.cycle(2);

    rig.send(b"G\n");
    rig.cycle(1);
    rig.send(b"F\n");
    rig.cycle(1);
    rig.send(b"E\n");
    rig.cycle(1);
    assert_eq!(rig.lines(), ["F3G", "F3G", "E0"]);
    assert!(matches!(rig.controller.state(), DispatchState::Running(_)));
}

#[test]
fn test_ping_cancels_running_task() {
    let mut rig = Rig::initialised();
    rig.cnc_auto = false;
    rig.send(b"z\n");
    rig.cycle(2);
    assert!(rig.shared.is_homing());

    rig.send(b"\n");
    rig.cycle(1);
    assert_eq!(rig.lines(), [" "]);
    assert_eq!(rig.controller.state(), DispatchState::Idle);
    assert!(!rig.shared.is_homing());
}

#[test]
fn test_ref_home() {
    let mut rig = Rig::initialised();
    rig.send(b"z\n");
    rig.cycle(3);
    rig.machine.set_moving(true);
    rig.shared.on_step_pulse();
    rig.cycle(3);
    // No telemetry while homing
    assert!(rig.lines().is_empty());
    rig.machine.set_moving(false);
    rig.cycle(8);

    assert_eq!(rig.cnc_log, ["zX", "ZX", "HX"]);
    assert_eq!(rig.lines(), ["Z1"]);
    assert!(!rig.shared.is_homing());
}

#[test]
fn test_cnc_timeout_faults() {
    let mut rig = Rig::initialised();
    rig.cnc_auto = false;
    rig.send(b"H\n");
    rig.cycle(2);
    rig.tick(101);
    rig.cycle(1);
    assert_eq!(rig.lines(), ["F9b"]);
    assert!(rig.shared.is_estopped());
    assert_eq!(rig.controller.state(), DispatchState::Idle);
}

#[test]
fn test_cnc_parameter_error_is_not_a_fault() {
    let mut rig = Rig::initialised();
    rig.cnc_override = Some(b"2\r\n");
    rig.send(b"s50\n");
    rig.cycle(4);
    assert_eq!(rig.cnc_log, ["sX16000"]);
    assert_eq!(rig.lines(), ["F5s"]);
    assert!(!rig.shared.is_estopped());
    assert_eq!(rig.controller.state(), DispatchState::Idle);
    assert_eq!(rig.controller.mirror().speed, 100);
}

#[test]
fn test_init_continues_after_cnc_parameter_error() {
    let mut rig = Rig::new(ControllerConfig::default());
    rig.send(b"@0\n");
    rig.cycle(3);
    rig.cnc_override = Some(b"2\r\n");
    rig.cycle(60);

    assert_eq!(rig.lines(), ["F5@", "@1"]);
    assert_eq!(rig.cnc_log.len(), 16);
    assert_eq!(rig.cnc_log[15], "E ");
    assert_eq!(rig.controller.state(), DispatchState::Idle);
    assert_eq!(
        rig.controller.error(),
        (ErrorCode::BadParameter, ErrorContext::tag(b'@'))
    );
    assert!(!rig.shared.is_estopped());
    assert_eq!(rig.controller.mirror().is_ref_homed, 1);
}

#[test]
fn test_cnc_hardware_error_faults() {
    let mut rig = Rig::initialised();
    rig.cnc_override = Some(b"5\r\n");
    rig.send(b"P\n");
    rig.cycle(4);
    assert_eq!(rig.lines(), ["F7b"]);
    assert!(rig.shared.is_estopped());
}

#[test]
fn test_round_trip_setter_updates_mirror() {
    let mut rig = Rig::initialised();
    rig.send(b"s150\n");
    rig.cycle(4);
    rig.send(b"S\n");
    rig.cycle(2);
    assert_eq!(rig.cnc_log, ["sX48000"]);
    assert_eq!(rig.lines(), ["S150", "S150"]);
}

#[test]
fn test_round_trip_rejects_before_sending() {
    let mut rig = Rig::initialised();
    // Above the top speed of 200
    rig.send(b"s250\n");
    rig.cycle(2);
    rig.send(b"q0\n");
    rig.cycle(2);
    assert!(rig.cnc_log.is_empty());
    // The sticky error gates the second request until cleared
    rig.send(b"f\n");
    rig.cycle(2);
    rig.send(b"q0\n");
    rig.cycle(2);
    assert_eq!(rig.lines(), ["F5s", "F5s", "F0 ", "F5q"]);
}

#[test]
fn test_local_parameters() {
    let mut rig = Rig::initialised();
    for request in [
        &b"g1000\n"[..],
        b"l3000\n",
        b"n-200\n",
        b"y-50\n",
        b"v0\n",
        b"r20\n",
        b"m-300\n",
    ] {
        rig.send(request);
        rig.cycle(2);
    }
    assert_eq!(
        rig.lines(),
        ["G1000", "L3000", "N-200", "Y-50", "V0", "R20", "F5m"]
    );
    let settings = rig.controller.settings();
    assert_eq!(settings.ground_level, 1000);
    assert_eq!(settings.probe_depth, 3000);
    assert!(!settings.force_delta_abs);
    assert_eq!(settings.lfd_tolerance, 20);
    assert_eq!(rig.shared.lfd_tolerance(), 20);
}

#[test]
fn test_ground_level_outside_travel() {
    let mut rig = Rig::initialised();
    // 3000 + depth 5000 is past the 7500 dmm travel
    rig.send(b"g3000\n");
    rig.cycle(2);
    assert_eq!(rig.lines(), ["F5g"]);
    assert_eq!(rig.controller.settings().ground_level, 2500);
}

#[test]
fn test_unrecognised_command() {
    let mut rig = Rig::initialised();
    rig.send(b"w1\n");
    rig.cycle(2);
    assert_eq!(rig.lines(), ["F2w"]);
}

#[test]
fn test_state_setters_are_not_accepted() {
    // Home, LFD and probe state and the force are read-only
    for (frame, reply) in [(b"h1\n", "F2h"), (b"u1\n", "F2u"), (b"j1\n", "F2j")] {
        let mut rig = Rig::initialised();
        let before = *rig.controller.settings();
        rig.send(frame);
        rig.cycle(2);
        assert_eq!(rig.lines(), [reply]);
        assert!(rig.cnc_log.is_empty());
        assert_eq!(*rig.controller.settings(), before);
    }
}

#[test]
fn test_logging_toggle() {
    let mut rig = Rig::initialised();
    rig.send(b"#\n");
    rig.cycle(2);
    rig.send(b"H\n");
    rig.cycle(3);
    let lines = rig.lines();
    assert_eq!(lines[0], "#1");
    assert!(lines.iter().any(|l| l == "# Setting task to H"));
    assert!(lines.iter().any(|l| l.starts_with("# Sent HX")));
    assert_eq!(lines.last().map(String::as_str), Some("H5"));
}

#[test]
fn test_lfd_trip() {
    let mut rig = Rig::initialised();
    for _ in 0..12 {
        rig.shared.on_tick(false);
    }
    rig.cycle(1);
    assert_eq!(rig.lines(), ["F6l"]);
    rig.send(b"U\n");
    rig.cycle(2);
    rig.send(b"F\n");
    rig.cycle(2);
    assert_eq!(rig.lines(), ["F6l", "F6l", "F6l"]);
}

#[test]
fn test_estop_edge_diagnoses_limit() {
    let mut rig = Rig::initialised();
    rig.home_state = 6;
    rig.shared.on_estop_edge();
    rig.cycle(6);
    assert_eq!(rig.cnc_log, ["FX", "HX"]);
    assert_eq!(rig.lines(), ["F6m"]);
    assert_eq!(
        rig.controller.error(),
        (ErrorCode::LimitExceeded, ErrorContext::MOTOR)
    );
}

#[test]
fn test_estop_edge_plain_press() {
    let mut rig = Rig::initialised();
    rig.shared.on_estop_edge();
    rig.cycle(6);
    assert_eq!(rig.lines(), ["F1e"]);
}

#[test]
fn test_sample_overlap_faults() {
    let mut rig = Rig::initialised();
    rig.send(b"!1\n");
    rig.cycle(12);
    rig.dcell_auto = false;
    rig.machine.set_moving(true);
    rig.shared.on_step_pulse();
    rig.cycle(1);
    rig.shared.on_step_pulse();
    rig.cycle(1);
    assert_eq!(rig.last_line().as_deref(), Some("F9c"));
}

#[test]
fn test_get_force() {
    let mut rig = Rig::initialised();
    rig.force = FORCE_50;
    rig.send(b"W\n");
    rig.cycle(6);
    assert_eq!(rig.dcell_requests.len(), 2);
    assert_eq!(rig.lines(), ["W50"]);
}

#[test]
fn test_cnc_passthrough() {
    let mut rig = Rig::initialised();
    rig.cnc_auto = false;
    rig.send(b"b\n");
    rig.cycle(1);

    rig.send(b"HX\r\n");
    rig.cycle(1);
    rig.cnc.push_rx(b"HX5\r\n");
    rig.cycle(1);
    assert_eq!(rig.lines(), ["HX5\r"]);

    // Step pulses are not sampled while relaying
    rig.shared.on_step_pulse();
    rig.cycle(1);
    assert!(rig.dcell_requests.is_empty());

    rig.send(b"**x*****");
    rig.cycle(1);
    assert_eq!(rig.controller.state(), DispatchState::Idle);
    assert_eq!(&rig.cnc.take_tx()[..], b"HX\r\n**x*****\r\n");
    assert!(rig.cnc.flushes() > 0);
}

#[test]
fn test_dcell_passthrough() {
    let mut rig = Rig::initialised();
    rig.force = FORCE_50;
    rig.send(b"c\n");
    rig.cycle(1);

    let mut request = [0x01, 0x03, 0x00, 0x1E, 0x00, 0x02, 0, 0];
    append_crc(&mut request);
    rig.send(&request);
    rig.cycle(6);
    assert_eq!(rig.dcell_requests, [request.to_vec()]);
    assert_eq!(rig.robot_rx, force_frame(FORCE_50).to_vec());

    rig.send(&[0x01, 0x2A, 0x00, 0x00, 0x00]);
    rig.cycle(1);
    assert_eq!(rig.controller.state(), DispatchState::Idle);
    assert_eq!(rig.dcell_requests.len(), 1);
}

#[test]
fn test_dcell_passthrough_rejects_unknown_function() {
    let mut rig = Rig::initialised();
    rig.send(b"c\n");
    rig.cycle(1);
    rig.send(&[0x01, 0x42]);
    rig.cycle(1);
    assert_eq!(rig.lines(), ["F9a"]);
    assert!(rig.shared.is_estopped());
}

#[test]
fn test_unsolicited_bad_dcell_frame_faults() {
    let mut rig = Rig::initialised();
    rig.dcell.push_rx(&force_frame(FORCE_0));
    rig.cycle(1);
    assert!(!rig.shared.is_estopped());

    rig.dcell.push_rx(&[0x01, 0x42, 0x00, 0x00]);
    rig.cycle(2);
    assert!(rig.lines().iter().any(|line| line == "F9c"));
    assert!(rig.shared.is_estopped());
    assert_eq!(rig.controller.error(), (ErrorCode::NoComms, ErrorContext::DCELL));
}

/// Tags refused while estopped: everything but ping, estop, error and logging
const GATED_TAGS: &[u8] = b"@~^!zgtskadlqrpmnxyvobcZGTSKADLWQRPMNXYVOHUJhujw?";

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn prop_latched_estop_refuses_gated_commands(
        frames in prop::collection::vec((prop::sample::select(GATED_TAGS), 0u32..100_000), 1..12)
    ) {
        let mut rig = Rig::initialised();
        rig.shared.latch_estop();
        let settings = *rig.controller.settings();
        let mirror = *rig.controller.mirror();

        for (tag, value) in &frames {
            rig.send(format!("{}{}\n", *tag as char, value).as_bytes());
            rig.cycle(3);
        }

        prop_assert!(rig.cnc_log.is_empty(), "CNC saw {:?}", rig.cnc_log);
        prop_assert!(rig.dcell_requests.is_empty());
        prop_assert_eq!(rig.lines(), vec!["E1"; frames.len()]);
        prop_assert_eq!(*rig.controller.settings(), settings);
        prop_assert_eq!(*rig.controller.mirror(), mirror);
        prop_assert_eq!(rig.controller.state(), DispatchState::Idle);
    }
}
