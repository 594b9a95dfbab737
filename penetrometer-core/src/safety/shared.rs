//! State shared between interrupt handlers and the control loop
//!
//! Interrupt-side operations (`on_*`) touch only atomics and never block.
//! Everything else is called from the control loop. Each flag is an
//! independent atomic; the one multi-field update, an LFD tolerance change,
//! runs inside a critical section so the tick handler never observes a
//! tolerance and counter from different settings.

use portable_atomic::{AtomicBool, AtomicI32, AtomicU32, AtomicU8, Ordering};

/// Flags and counters written from interrupt context
#[derive(Debug)]
pub struct SharedSafetyState {
    tick: AtomicU32,

    estop_latched: AtomicBool,
    estop_event: AtomicBool,

    watchdog_remaining: AtomicU32,
    watchdog_expired: AtomicBool,

    lfd_tolerance: AtomicU8,
    lfd_count: AtomicU8,
    lfd_tripped: AtomicBool,

    relay_active: AtomicBool,
    homing: AtomicBool,
    probing: AtomicBool,
    probe_down: AtomicBool,
    started_moving: AtomicBool,
    sample_step: AtomicI32,
    sample_index: AtomicI32,
    sample_outstanding: AtomicBool,
    sample_requested: AtomicBool,
    sample_overlap: AtomicBool,
}

impl Default for SharedSafetyState {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedSafetyState {
    /// Create the shared state; usable as a `static`
    pub const fn new() -> Self {
        Self {
            tick: AtomicU32::new(0),
            estop_latched: AtomicBool::new(false),
            estop_event: AtomicBool::new(false),
            watchdog_remaining: AtomicU32::new(0),
            watchdog_expired: AtomicBool::new(false),
            lfd_tolerance: AtomicU8::new(0),
            lfd_count: AtomicU8::new(0),
            lfd_tripped: AtomicBool::new(false),
            relay_active: AtomicBool::new(false),
            homing: AtomicBool::new(false),
            probing: AtomicBool::new(false),
            probe_down: AtomicBool::new(false),
            started_moving: AtomicBool::new(false),
            sample_step: AtomicI32::new(0),
            sample_index: AtomicI32::new(0),
            sample_outstanding: AtomicBool::new(false),
            sample_requested: AtomicBool::new(false),
            sample_overlap: AtomicBool::new(false),
        }
    }

    // ---- interrupt context ----

    /// Periodic tick
    ///
    /// `lfd_asserted` is the current level of the limit/fault detector.
    pub fn on_tick(&self, lfd_asserted: bool) {
        self.tick.fetch_add(1, Ordering::Relaxed);

        let previous = self
            .watchdog_remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |w| w.checked_sub(1));
        if previous == Ok(1) {
            self.watchdog_expired.store(true, Ordering::Release);
        }

        if lfd_asserted {
            self.lfd_count
                .store(self.lfd_tolerance.load(Ordering::Acquire), Ordering::Release);
            self.lfd_tripped.store(false, Ordering::Release);
        } else {
            let _ = self
                .lfd_count
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |c| c.checked_sub(1));
        }
    }

    /// Step pulse from the CNC
    ///
    /// Advances the sample index and asks the control loop for a force
    /// sample. A pulse arriving while the previous sample is still
    /// outstanding is recorded as an overlap.
    pub fn on_step_pulse(&self) {
        if self.relay_active.load(Ordering::Acquire) {
            return;
        }
        self.started_moving.store(true, Ordering::Release);

        let step = self.sample_step.load(Ordering::Relaxed);
        if self.probe_down.load(Ordering::Relaxed) {
            self.sample_index.fetch_add(step, Ordering::AcqRel);
        } else {
            self.sample_index.fetch_sub(step, Ordering::AcqRel);
        }

        if self.sample_outstanding.swap(true, Ordering::AcqRel) {
            self.sample_overlap.store(true, Ordering::Release);
        } else {
            self.sample_requested.store(true, Ordering::Release);
        }
    }

    /// Falling edge on the estop chain
    ///
    /// Only an edge that causes the latch raises the event; the edge that
    /// follows the controller driving the line itself does not.
    pub fn on_estop_edge(&self) {
        if !self.estop_latched.swap(true, Ordering::AcqRel) {
            self.estop_event.store(true, Ordering::Release);
        }
        self.homing.store(false, Ordering::Release);
        self.probing.store(false, Ordering::Release);
    }

    // ---- control loop ----

    /// Ticks since boot (wraps)
    pub fn now(&self) -> u32 {
        self.tick.load(Ordering::Relaxed)
    }

    pub fn is_estopped(&self) -> bool {
        self.estop_latched.load(Ordering::Acquire)
    }

    pub fn latch_estop(&self) {
        self.estop_latched.store(true, Ordering::Release);
    }

    pub fn clear_estop(&self) {
        self.estop_latched.store(false, Ordering::Release);
    }

    /// Consume the estop edge notification
    pub fn take_estop_event(&self) -> bool {
        self.estop_event.swap(false, Ordering::AcqRel)
    }

    /// Reload the Robot watchdog
    pub fn feed_watchdog(&self, ticks: u32) {
        self.watchdog_remaining.store(ticks, Ordering::Release);
    }

    /// Consume the watchdog expiry notification
    pub fn take_watchdog_expired(&self) -> bool {
        self.watchdog_expired.swap(false, Ordering::AcqRel)
    }

    /// Change the LFD debounce length and restart the count
    pub fn set_lfd_tolerance(&self, tolerance: u8) {
        critical_section::with(|_| {
            self.lfd_tolerance.store(tolerance, Ordering::Release);
            self.lfd_count.store(tolerance, Ordering::Release);
            self.lfd_tripped.store(false, Ordering::Release);
        });
    }

    pub fn lfd_tolerance(&self) -> u8 {
        self.lfd_tolerance.load(Ordering::Acquire)
    }

    /// True once the LFD trip has fired and not yet re-armed
    pub fn lfd_tripped(&self) -> bool {
        self.lfd_tripped.load(Ordering::Acquire)
    }

    /// One-shot LFD trip
    ///
    /// Returns true the first time the debounce counter is seen at zero with
    /// a non-zero tolerance; re-armed when the sensor reasserts.
    pub fn take_lfd_trip(&self) -> bool {
        if self.lfd_tolerance.load(Ordering::Acquire) == 0
            || self.lfd_count.load(Ordering::Acquire) != 0
        {
            return false;
        }
        self.lfd_tripped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Suppress step-pulse sampling while bytes are relayed to the CNC
    pub fn set_relay_active(&self, active: bool) {
        self.relay_active.store(active, Ordering::Release);
    }

    pub fn set_homing(&self, homing: bool) {
        self.homing.store(homing, Ordering::Release);
    }

    pub fn is_homing(&self) -> bool {
        self.homing.load(Ordering::Acquire)
    }

    pub fn is_probing(&self) -> bool {
        self.probing.load(Ordering::Acquire)
    }

    /// Arm sampling for a probe move
    pub fn begin_probe(&self, down: bool, step: i32, index: i32) {
        critical_section::with(|_| {
            self.homing.store(false, Ordering::Release);
            self.started_moving.store(false, Ordering::Release);
            self.probe_down.store(down, Ordering::Release);
            self.sample_step.store(step, Ordering::Release);
            self.sample_index.store(index, Ordering::Release);
            self.probing.store(true, Ordering::Release);
        });
    }

    pub fn end_probe(&self) {
        self.probing.store(false, Ordering::Release);
    }

    pub fn started_moving(&self) -> bool {
        self.started_moving.load(Ordering::Acquire)
    }

    pub fn clear_started_moving(&self) {
        self.started_moving.store(false, Ordering::Release);
    }

    pub fn sample_index(&self) -> i32 {
        self.sample_index.load(Ordering::Acquire)
    }

    pub fn reset_sample_index(&self) {
        self.sample_index.store(0, Ordering::Release);
    }

    /// Consume a pending sample request from the step interrupt
    pub fn take_sample_request(&self) -> bool {
        self.sample_requested.swap(false, Ordering::AcqRel)
    }

    /// Consume the overlapping-sample notification
    pub fn take_sample_overlap(&self) -> bool {
        self.sample_overlap.swap(false, Ordering::AcqRel)
    }

    pub fn sample_outstanding(&self) -> bool {
        self.sample_outstanding.load(Ordering::Acquire)
    }

    /// The outstanding sample was answered or abandoned
    pub fn sample_done(&self) {
        self.sample_requested.store(false, Ordering::Release);
        self.sample_outstanding.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tick_counts() {
        let shared = SharedSafetyState::new();
        for _ in 0..5 {
            shared.on_tick(true);
        }
        assert_eq!(shared.now(), 5);
    }

    #[test]
    fn test_watchdog_fires_once() {
        let shared = SharedSafetyState::new();
        shared.feed_watchdog(3);
        shared.on_tick(true);
        shared.on_tick(true);
        assert!(!shared.take_watchdog_expired());
        shared.on_tick(true);
        assert!(shared.take_watchdog_expired());
        shared.on_tick(true);
        shared.on_tick(true);
        assert!(!shared.take_watchdog_expired());
    }

    #[test]
    fn test_watchdog_feed_postpones_expiry() {
        let shared = SharedSafetyState::new();
        shared.feed_watchdog(2);
        shared.on_tick(true);
        shared.feed_watchdog(2);
        shared.on_tick(true);
        assert!(!shared.take_watchdog_expired());
        shared.on_tick(true);
        assert!(shared.take_watchdog_expired());
    }

    #[test]
    fn test_lfd_debounce_and_rearm() {
        let shared = SharedSafetyState::new();
        shared.set_lfd_tolerance(3);

        shared.on_tick(false);
        shared.on_tick(false);
        assert!(!shared.take_lfd_trip());
        shared.on_tick(false);
        assert!(shared.take_lfd_trip());
        // One-shot
        shared.on_tick(false);
        assert!(!shared.take_lfd_trip());
        assert!(shared.lfd_tripped());

        // Sensor reasserts: counter reloads and trip re-arms
        shared.on_tick(true);
        assert!(!shared.lfd_tripped());
        for _ in 0..3 {
            shared.on_tick(false);
        }
        assert!(shared.take_lfd_trip());
    }

    #[test]
    fn test_lfd_zero_tolerance_disables_trip() {
        let shared = SharedSafetyState::new();
        shared.set_lfd_tolerance(0);
        for _ in 0..10 {
            shared.on_tick(false);
        }
        assert!(!shared.take_lfd_trip());
    }

    #[test]
    fn test_step_pulse_requests_sample() {
        let shared = SharedSafetyState::new();
        shared.begin_probe(true, 10, -100);

        shared.on_step_pulse();
        assert!(shared.started_moving());
        assert_eq!(shared.sample_index(), -90);
        assert!(shared.take_sample_request());
        assert!(!shared.take_sample_request());

        // Second pulse before the first sample returns
        shared.on_step_pulse();
        assert!(shared.take_sample_overlap());
        assert!(!shared.take_sample_request());

        shared.sample_done();
        shared.on_step_pulse();
        assert!(shared.take_sample_request());
        assert!(!shared.take_sample_overlap());
        assert_eq!(shared.sample_index(), -70);
    }

    #[test]
    fn test_step_pulse_upward_and_relay() {
        let shared = SharedSafetyState::new();
        shared.begin_probe(false, 4, 40);
        shared.on_step_pulse();
        assert_eq!(shared.sample_index(), 36);
        shared.sample_done();

        shared.set_relay_active(true);
        shared.on_step_pulse();
        assert_eq!(shared.sample_index(), 36);
        assert!(!shared.sample_outstanding());
    }

    #[test]
    fn test_estop_edge() {
        let shared = SharedSafetyState::new();
        shared.set_homing(true);
        shared.begin_probe(true, 1, 0);

        shared.on_estop_edge();
        assert!(shared.is_estopped());
        assert!(!shared.is_homing());
        assert!(!shared.is_probing());
        assert!(shared.take_estop_event());
        assert!(!shared.take_estop_event());
        assert!(shared.is_estopped());
    }

    #[test]
    fn test_estop_edge_after_latch_is_silent() {
        let shared = SharedSafetyState::new();
        shared.latch_estop();
        shared.on_estop_edge();
        assert!(!shared.take_estop_event());
    }
}
