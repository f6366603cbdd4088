//! A simulated sensor rig: capture unit, echo line and trigger line in software.
//!
//! The rig plays the role of both the timer hardware and the physical
//! sensor. Responders registered with [`SimulatedRig::respond_with`] run
//! when a trigger pulse ends, and typically answer with
//! [`SimulatedRig::echo_pulse`].

use std::sync::Arc;

use aurus_capture::sim::{SimulatedPin, SimulatedTimer};
use aurus_capture::{CaptureEdge, InputCaptureUnit, SharedCaptureUnit};

use crate::config::UltrasonicConfig;
use crate::error::UltrasonicError;
use crate::sensor::Ultrasonic;

/// Driver type produced by [`SimulatedRig::sensor`].
pub type SimulatedUltrasonic = Ultrasonic<SimulatedTimer, SimulatedPin, SimulatedPin>;

/// Software stand-in for a sensor wired to a capture timer. Clones share the rig.
#[derive(Clone)]
pub struct SimulatedRig {
    unit: SharedCaptureUnit<SimulatedTimer, SimulatedPin>,
    echo: SimulatedPin,
    trigger: SimulatedPin,
}

impl Default for SimulatedRig {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedRig {
    /// A rig with a reset timer, a low echo line and no responder.
    pub fn new() -> Self {
        let echo = SimulatedPin::new();
        let unit = InputCaptureUnit::new(SimulatedTimer::new(), echo.clone()).into_shared();
        Self { unit, echo, trigger: SimulatedPin::new() }
    }

    /// A driver wired to this rig.
    pub fn sensor(&self, config: UltrasonicConfig) -> Result<SimulatedUltrasonic, UltrasonicError> {
        Ultrasonic::new(Arc::clone(&self.unit), self.trigger.clone(), config)
    }

    /// The simulated capture unit.
    pub fn unit(&self) -> &SharedCaptureUnit<SimulatedTimer, SimulatedPin> {
        &self.unit
    }

    /// The trigger line as seen by the sensor.
    pub fn trigger_pin(&self) -> &SimulatedPin {
        &self.trigger
    }

    /// The echo line as seen by the capture unit.
    pub fn echo_pin(&self) -> &SimulatedPin {
        &self.echo
    }

    /// Drive one transition on the echo line, raising the capture interrupt
    /// if the timer latches it.
    pub fn edge(&self, edge: CaptureEdge) {
        self.echo.drive(edge == CaptureEdge::Rising);
        let mut unit = self.unit.lock();
        if unit.timer_mut().sense(edge) {
            unit.handle_capture_interrupt();
        }
    }

    /// Let `ticks` timer ticks pass.
    pub fn elapse(&self, ticks: u16) {
        self.unit.lock().timer_mut().advance_ticks(ticks);
    }

    /// A complete echo pulse `ticks` wide.
    pub fn echo_pulse(&self, ticks: u16) {
        self.edge(CaptureEdge::Rising);
        self.elapse(ticks);
        self.edge(CaptureEdge::Falling);
    }

    /// Run `responder` at the end of every trigger pulse, replacing any
    /// previous responder.
    pub fn respond_with<F>(&self, mut responder: F)
    where
        F: FnMut(&SimulatedRig) + Send + 'static,
    {
        let rig = self.clone();
        self.trigger.on_release(move || responder(&rig));
    }

    /// Answer every trigger with an echo pulse of the width `pulse` returns,
    /// or with silence when it returns `None`.
    pub fn echo_on_trigger<F>(&self, mut pulse: F)
    where
        F: FnMut() -> Option<u16> + Send + 'static,
    {
        self.respond_with(move |rig| {
            if let Some(ticks) = pulse() {
                rig.echo_pulse(ticks);
            }
        });
    }
}
