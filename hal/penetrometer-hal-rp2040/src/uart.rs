//! UART pin mapping
//!
//! The RP2040 routes each UART's TX and RX to fixed GPIO pairs. Board
//! bring-up checks its pin table against this before claiming peripherals.

/// UART peripheral identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum UartId {
    Uart0,
    Uart1,
}

/// UART whose TX function is available on `gpio`
pub fn tx_uart(gpio: u8) -> Option<UartId> {
    match gpio {
        0 | 12 | 16 | 28 => Some(UartId::Uart0),
        4 | 8 | 20 | 24 => Some(UartId::Uart1),
        _ => None,
    }
}

/// UART whose RX function is available on `gpio`
pub fn rx_uart(gpio: u8) -> Option<UartId> {
    match gpio {
        1 | 13 | 17 | 29 => Some(UartId::Uart0),
        5 | 9 | 21 | 25 => Some(UartId::Uart1),
        _ => None,
    }
}

/// The UART serving a TX/RX pin pair, if both pins belong to the same one
pub fn uart_for_pins(tx: u8, rx: u8) -> Option<UartId> {
    let id = tx_uart(tx)?;
    (rx_uart(rx) == Some(id)).then_some(id)
}
