//! UART pump tasks
//!
//! One receive and one transmit task per peer, moving bytes between the
//! UART drivers and the static link buffers the control loop reads.

use defmt::*;
use embassy_rp::peripherals::PIO0;
use embassy_rp::pio_programs::uart::{PioUartRx, PioUartTx};
use embassy_rp::uart::{BufferedUartRx, BufferedUartTx};

use crate::channels::{CNC_LINK, DCELL_LINK, ROBOT_LINK};

#[embassy_executor::task]
pub async fn robot_rx_task(mut rx: BufferedUartRx) {
    info!("Robot RX task started");
    ROBOT_LINK.pump_rx(&mut rx).await
}

#[embassy_executor::task]
pub async fn robot_tx_task(mut tx: BufferedUartTx) {
    info!("Robot TX task started");
    ROBOT_LINK.pump_tx(&mut tx).await
}

#[embassy_executor::task]
pub async fn cnc_rx_task(mut rx: BufferedUartRx) {
    info!("CNC RX task started");
    CNC_LINK.pump_rx(&mut rx).await
}

#[embassy_executor::task]
pub async fn cnc_tx_task(mut tx: BufferedUartTx) {
    info!("CNC TX task started");
    CNC_LINK.pump_tx(&mut tx).await
}

/// DCell receive runs on PIO0 state machine 1
#[embassy_executor::task]
pub async fn dcell_rx_task(mut rx: PioUartRx<'static, PIO0, 1>) {
    info!("DCell RX task started");
    DCELL_LINK.pump_rx(&mut rx).await
}

/// DCell transmit runs on PIO0 state machine 0
#[embassy_executor::task]
pub async fn dcell_tx_task(mut tx: PioUartTx<'static, PIO0, 0>) {
    info!("DCell TX task started");
    DCELL_LINK.pump_tx(&mut tx).await
}
