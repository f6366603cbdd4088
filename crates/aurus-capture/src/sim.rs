//! Register-accurate software stand-ins for a capture timer and a digital pin.
//!
//! These back the unit tests and the host-side demo driver. The timer models
//! a 16-bit free-running counter, an edge-select bit, a capture latch and an
//! interrupt enable; the caller advances time and reports pin transitions.

use core::convert::Infallible;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::gpio::{DigitalPin, PinDirection};
use crate::timer::CaptureTimer;
use crate::types::{CaptureEdge, ClockPrescaler};

/// Simulated timer channel with input capture.
#[derive(Debug, Clone, Default)]
pub struct SimulatedTimer {
    prescaler: ClockPrescaler,
    edge: CaptureEdge,
    counter: u16,
    latch: u16,
    interrupt_enabled: bool,
    captures: u32,
}

impl SimulatedTimer {
    /// A timer in its reset state: clock stopped, falling edge, all zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the counter by `ticks`, wrapping at 16 bits. No-op while stopped.
    pub fn advance_ticks(&mut self, ticks: u16) {
        if self.prescaler.is_running() {
            self.counter = self.counter.wrapping_add(ticks);
        }
    }

    /// Report a transition on the capture pin.
    ///
    /// A transition matching the armed edge latches the counter. Returns
    /// `true` when the capture interrupt should fire.
    pub fn sense(&mut self, edge: CaptureEdge) -> bool {
        if edge != self.edge {
            return false;
        }
        self.latch = self.counter;
        self.captures = self.captures.wrapping_add(1);
        self.interrupt_enabled
    }

    /// Current counter value.
    pub fn counter(&self) -> u16 {
        self.counter
    }

    /// Selected tick source.
    pub fn prescaler(&self) -> ClockPrescaler {
        self.prescaler
    }

    /// Whether the capture interrupt is enabled.
    pub fn interrupt_enabled(&self) -> bool {
        self.interrupt_enabled
    }

    /// Number of latch events since creation.
    pub fn captures(&self) -> u32 {
        self.captures
    }
}

impl CaptureTimer for SimulatedTimer {
    fn configure(&mut self, prescaler: ClockPrescaler, edge: CaptureEdge) {
        self.prescaler = prescaler;
        self.edge = edge;
    }

    fn select_edge(&mut self, edge: CaptureEdge) {
        self.edge = edge;
    }

    fn armed_edge(&self) -> CaptureEdge {
        self.edge
    }

    fn reset_counter(&mut self) {
        self.counter = 0;
    }

    fn reset_latch(&mut self) {
        self.latch = 0;
    }

    fn latched_value(&self) -> u16 {
        self.latch
    }

    fn enable_capture_interrupt(&mut self) {
        self.interrupt_enabled = true;
    }

    fn disable_capture_interrupt(&mut self) {
        self.interrupt_enabled = false;
    }
}

type ReleaseHook = Box<dyn FnMut() + Send>;

#[derive(Default)]
struct PinState {
    direction: Option<PinDirection>,
    high: bool,
    pulses: u32,
}

/// Simulated digital pin. Clones share the same line.
///
/// A hook registered with [`SimulatedPin::on_release`] runs every time the
/// pin is driven from high to low, which is how the simulated sensor learns
/// that a trigger pulse has ended.
#[derive(Clone, Default)]
pub struct SimulatedPin {
    state: Arc<Mutex<PinState>>,
    on_release: Arc<Mutex<Option<ReleaseHook>>>,
}

impl SimulatedPin {
    /// A low, unconfigured pin.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `hook` after every high-to-low transition, replacing any previous hook.
    pub fn on_release<F>(&self, hook: F)
    where
        F: FnMut() + Send + 'static,
    {
        *self.on_release.lock() = Some(Box::new(hook));
    }

    /// Set the line level from outside, as an external device would.
    pub fn drive(&self, high: bool) {
        self.state.lock().high = high;
    }

    /// Configured direction, `None` until `set_direction` is called.
    pub fn direction(&self) -> Option<PinDirection> {
        self.state.lock().direction
    }

    /// Current line level.
    pub fn is_high(&self) -> bool {
        self.state.lock().high
    }

    /// Number of completed high-to-low pulses driven through [`DigitalPin`].
    pub fn pulses(&self) -> u32 {
        self.state.lock().pulses
    }
}

impl DigitalPin for SimulatedPin {
    type Error = Infallible;

    fn set_direction(&mut self, direction: PinDirection) -> Result<(), Self::Error> {
        self.state.lock().direction = Some(direction);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.state.lock().high = true;
        Ok(())
    }

    fn set_low(&mut self) -> Result<(), Self::Error> {
        let released = {
            let mut state = self.state.lock();
            let was_high = state.high;
            state.high = false;
            if was_high {
                state.pulses = state.pulses.wrapping_add(1);
            }
            was_high
        };
        if released {
            if let Some(hook) = self.on_release.lock().as_mut() {
                hook();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_counter_wraps_at_16_bits() {
        let mut timer = SimulatedTimer::new();
        timer.configure(ClockPrescaler::Div1, CaptureEdge::Rising);
        timer.advance_ticks(u16::MAX);
        timer.advance_ticks(3);
        assert_eq!(timer.counter(), 2);
    }

    #[test]
    fn test_stopped_clock_does_not_count() {
        let mut timer = SimulatedTimer::new();
        timer.advance_ticks(100);
        assert_eq!(timer.counter(), 0);
    }

    #[test]
    fn test_latch_without_interrupt() {
        let mut timer = SimulatedTimer::new();
        timer.configure(ClockPrescaler::Div8, CaptureEdge::Rising);
        timer.advance_ticks(17);
        assert!(!timer.sense(CaptureEdge::Rising));
        assert_eq!(timer.latched_value(), 17);
        assert!(!timer.sense(CaptureEdge::Falling));
        assert_eq!(timer.captures(), 1);
    }

    #[test]
    fn test_release_hook_runs_on_falling_transition_only() {
        let mut pin = SimulatedPin::new();
        let releases = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&releases);
        pin.on_release(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        pin.set_low().unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 0);
        pin.set_high().unwrap();
        pin.set_low().unwrap();
        assert_eq!(releases.load(Ordering::SeqCst), 1);
        assert_eq!(pin.pulses(), 1);
        assert!(!pin.is_high());
    }

    #[test]
    fn test_clones_share_line() {
        let mut pin = SimulatedPin::new();
        let observer = pin.clone();
        pin.set_direction(PinDirection::Output).unwrap();
        pin.set_high().unwrap();
        assert!(observer.is_high());
        assert_eq!(observer.direction(), Some(PinDirection::Output));
    }
}
