//! Supervisor clock
//!
//! Advances the shared tick counter and samples the limit force detector
//! once per tick, standing in for the timer interrupt.

use defmt::*;
use embassy_rp::gpio::Input;
use embassy_time::{Duration, Ticker};

use crate::channels::SAFETY;

/// Tick task - drives `SharedSafetyState::on_tick`
#[embassy_executor::task]
pub async fn tick_task(lfd: Input<'static>, tick_ms: u32) {
    info!("Tick task started ({} ms)", tick_ms);

    let mut ticker = Ticker::every(Duration::from_millis(tick_ms as u64));

    loop {
        ticker.next().await;
        SAFETY.on_tick(lfd.is_high());
    }
}
