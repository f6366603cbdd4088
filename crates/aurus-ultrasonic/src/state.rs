//! Measurement state shared between the capture interrupt and the reader.
//!
//! The edge processor is the only writer of `phase` and `pulse_ticks`; the
//! reader only observes them, apart from forcing the phase back to
//! [`EchoPhase::AwaitingRisingEdge`] after a timeout. Completed cycles are
//! counted under a mutex so the reader can block on a condition variable
//! instead of spinning.

use core::sync::atomic::{AtomicU16, AtomicU32, AtomicU8, Ordering};
use core::time::Duration;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

/// Which echo edge the state machine expects next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum EchoPhase {
    /// Waiting for the echo line to go high.
    AwaitingRisingEdge = 0,
    /// Echo line is high; the counter is timing the pulse.
    AwaitingFallingEdge = 1,
}

impl EchoPhase {
    fn from_bits(bits: u8) -> Self {
        match bits {
            1 => EchoPhase::AwaitingFallingEdge,
            _ => EchoPhase::AwaitingRisingEdge,
        }
    }
}

/// Phase and last pulse width of one sensor, plus completion signalling.
#[derive(Debug)]
pub struct EchoState {
    phase: AtomicU8,
    pulse_ticks: AtomicU16,
    rejected: AtomicU32,
    cycles: Mutex<u64>,
    completed: Condvar,
}

impl Default for EchoState {
    fn default() -> Self {
        Self::new()
    }
}

impl EchoState {
    /// Fresh state awaiting a rising edge, no measurement recorded.
    pub fn new() -> Self {
        EchoState {
            phase: AtomicU8::new(EchoPhase::AwaitingRisingEdge as u8),
            pulse_ticks: AtomicU16::new(0),
            rejected: AtomicU32::new(0),
            cycles: Mutex::new(0),
            completed: Condvar::new(),
        }
    }

    /// Current phase.
    pub fn phase(&self) -> EchoPhase {
        EchoPhase::from_bits(self.phase.load(Ordering::Acquire))
    }

    pub(crate) fn set_phase(&self, phase: EchoPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    /// Pulse width recorded by the most recent completed cycle.
    pub fn pulse_ticks(&self) -> u16 {
        self.pulse_ticks.load(Ordering::Acquire)
    }

    /// Number of completed rising/falling cycles.
    pub fn completed_cycles(&self) -> u64 {
        *self.cycles.lock()
    }

    /// Number of pulses discarded by the glitch policy.
    pub fn rejected_glitches(&self) -> u32 {
        self.rejected.load(Ordering::Relaxed)
    }

    /// Record a completed cycle and wake any waiting reader.
    pub(crate) fn publish(&self, ticks: u16) {
        let mut cycles = self.cycles.lock();
        self.pulse_ticks.store(ticks, Ordering::Release);
        *cycles += 1;
        self.completed.notify_all();
    }

    pub(crate) fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Return to the start of a cycle without touching the recorded pulse.
    pub(crate) fn reset_phase(&self) {
        self.set_phase(EchoPhase::AwaitingRisingEdge);
    }

    /// Block until more than `seen` cycles have completed and return the
    /// pulse width of the latest one.
    ///
    /// With `timeout` set, gives up after that long and returns `None`.
    /// Without it, waits forever.
    pub fn wait_for_cycle(&self, seen: u64, timeout: Option<Duration>) -> Option<u16> {
        let mut cycles = self.cycles.lock();
        match timeout {
            None => {
                while *cycles == seen {
                    self.completed.wait(&mut cycles);
                }
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;
                while *cycles == seen {
                    if self.completed.wait_until(&mut cycles, deadline).timed_out() && *cycles == seen
                    {
                        return None;
                    }
                }
            }
        }
        Some(self.pulse_ticks.load(Ordering::Acquire))
    }
}
