//! Penetrometer - Soil Penetrometer Controller Firmware
//!
//! Main firmware binary for the RP2040 penetrometer carrier board. The
//! controller sits between the operator's Robot, the CNC motion
//! controller and the DCell load cell, relaying their commands and
//! holding the probe inside its force and travel limits.

#![no_std]
#![no_main]

use defmt::*;
use embassy_executor::Spawner;
use embassy_rp::bind_interrupts;
use embassy_rp::gpio::{Input, Level, Output, Pull};
use embassy_rp::peripherals::{PIO0, UART0, UART1};
use embassy_rp::pio::{InterruptHandler as PioInterruptHandler, Pio};
use embassy_rp::pio_programs::uart::{PioUartRx, PioUartRxProgram, PioUartTx, PioUartTxProgram};
use embassy_rp::uart::{BufferedInterruptHandler, Config as UartConfig, Uart};
use static_cell::StaticCell;
use {defmt_rtt as _, panic_probe as _};

use penetrometer_hal_rp2040::uart::uart_for_pins;
use penetrometer_hal_rp2040::{BoardIo, UartId};

use crate::board::{
    CNC_PINS, DCELL_PINS, ESTOP_DRIVE_PIN, ESTOP_SENSE_PIN, LFD_PIN, MOVING_PIN, ROBOT_PINS,
    STEP_PULSE_PIN,
};
use crate::channels::{CNC_LINK, DCELL_LINK, ESTOP_SENSE, ROBOT_LINK};

/// Embedded configuration (compiled into firmware)
/// Edit penetrometer.toml and rebuild to customize
const EMBEDDED_CONFIG: &str = include_str!("../penetrometer.toml");

mod board;
mod channels;
mod config;
mod tasks;

bind_interrupts!(struct Irqs {
    UART0_IRQ => BufferedInterruptHandler<UART0>;
    UART1_IRQ => BufferedInterruptHandler<UART1>;
    PIO0_IRQ_0 => PioInterruptHandler<PIO0>;
});

// Static cells for UART driver buffers (must live forever)
static ROBOT_TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static ROBOT_RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static CNC_TX_BUF: StaticCell<[u8; 256]> = StaticCell::new();
static CNC_RX_BUF: StaticCell<[u8; 256]> = StaticCell::new();

/// Main entry point
#[embassy_executor::main]
async fn main(spawner: Spawner) {
    info!("Penetrometer firmware starting...");

    let p = embassy_rp::init(Default::default());
    info!("Peripherals initialized");

    let config = config::load(EMBEDDED_CONFIG);
    info!(
        "Tick {} ms, links at {} baud",
        config.board.tick_ms, config.board.baud
    );

    check_uart_pins("Robot", ROBOT_PINS, UartId::Uart0);
    check_uart_pins("CNC", CNC_PINS, UartId::Uart1);

    let mut uart_config = UartConfig::default();
    uart_config.baudrate = config.board.baud;

    // Robot link on UART0
    let robot_uart = Uart::new_blocking(p.UART0, p.PIN_0, p.PIN_1, uart_config.clone());
    let robot_uart = robot_uart.into_buffered(
        Irqs,
        ROBOT_TX_BUF.init([0u8; 256]),
        ROBOT_RX_BUF.init([0u8; 256]),
    );
    let (robot_tx, robot_rx) = robot_uart.split();

    // CNC link on UART1
    let cnc_uart = Uart::new_blocking(p.UART1, p.PIN_4, p.PIN_5, uart_config);
    let cnc_uart = cnc_uart.into_buffered(
        Irqs,
        CNC_TX_BUF.init([0u8; 256]),
        CNC_RX_BUF.init([0u8; 256]),
    );
    let (cnc_tx, cnc_rx) = cnc_uart.split();

    info!("UARTs initialized");

    // DCell link on a PIO UART: the RP2040 only has two hardware UARTs
    let Pio {
        mut common,
        sm0,
        sm1,
        ..
    } = Pio::new(p.PIO0, Irqs);

    let tx_program = PioUartTxProgram::new(&mut common);
    let dcell_tx = PioUartTx::new(config.board.baud, &mut common, sm0, p.PIN_6, &tx_program);
    let rx_program = PioUartRxProgram::new(&mut common);
    let dcell_rx = PioUartRx::new(config.board.baud, &mut common, sm1, p.PIN_7, &rx_program);

    info!(
        "DCell PIO UART initialized (TX GPIO{}, RX GPIO{})",
        DCELL_PINS.0, DCELL_PINS.1
    );

    // Machine signals
    let step_pulse = Input::new(p.PIN_10, Pull::Down);
    let moving = Input::new(p.PIN_11, Pull::Down);
    let lfd = Input::new(p.PIN_12, Pull::Down);
    let estop_sense = Input::new(p.PIN_13, Pull::Up);
    let estop_drive = Output::new(p.PIN_14, Level::Low);
    let machine = BoardIo::new(moving, estop_drive, &ESTOP_SENSE);

    info!(
        "GPIO initialized (step {}, moving {}, LFD {}, estop sense {}, estop drive {})",
        STEP_PULSE_PIN, MOVING_PIN, LFD_PIN, ESTOP_SENSE_PIN, ESTOP_DRIVE_PIN
    );

    // Spawn tasks
    spawner.spawn(tasks::robot_rx_task(robot_rx)).unwrap();
    spawner.spawn(tasks::robot_tx_task(robot_tx)).unwrap();
    spawner.spawn(tasks::cnc_rx_task(cnc_rx)).unwrap();
    spawner.spawn(tasks::cnc_tx_task(cnc_tx)).unwrap();
    spawner.spawn(tasks::dcell_rx_task(dcell_rx)).unwrap();
    spawner.spawn(tasks::dcell_tx_task(dcell_tx)).unwrap();
    spawner.spawn(tasks::estop_task(estop_sense)).unwrap();
    spawner.spawn(tasks::step_pulse_task(step_pulse)).unwrap();
    spawner
        .spawn(tasks::tick_task(lfd, config.board.tick_ms))
        .unwrap();
    spawner
        .spawn(tasks::control_task(
            config.controller,
            ROBOT_LINK.link(),
            CNC_LINK.link(),
            DCELL_LINK.link(),
            machine,
        ))
        .unwrap();

    info!("All tasks spawned, firmware running");

    // The PIO common block stays owned here for the life of the firmware
    loop {
        embassy_time::Timer::after_secs(60).await;
        trace!("Main loop heartbeat");
    }
}

/// Check a link's pin pair against the UART it is wired to
fn check_uart_pins(name: &str, (tx, rx): (u8, u8), expected: UartId) {
    match uart_for_pins(tx, rx) {
        Some(id) if id == expected => {
            debug!("{} link on {:?} (TX GPIO{}, RX GPIO{})", name, id, tx, rx)
        }
        found => error!(
            "{} link pins GPIO{}/GPIO{} map to {:?}, expected {:?}",
            name, tx, rx, found, expected
        ),
    }
}
